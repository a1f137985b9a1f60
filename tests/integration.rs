use std::{env, fs, path::PathBuf, process::Command};

fn write_config(test_dir: &PathBuf, quantity: usize, episodes: usize) {
    let config_contents = format!(
        "[population]\n\
         quantity = {quantity}\n\
         max_x = 10.0\n\
         max_y = 10.0\n\
         infected_rate = 0.05\n\
         \n\
         [movement]\n\
         chance_to_move = 0.5\n\
         move_radius = 0.8\n\
         \n\
         [run]\n\
         episodes = {episodes}\n\
         seed = 42\n\
         \n\
         [output]\n\
         frame_width = 160\n\
         frame_height = 90\n\
         video = false\n"
    );
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");
}

fn run_bin(args: &[&str]) -> bool {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_spread"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    if !output.status.success() {
        let stderr_str = String::from_utf8_lossy(&output.stderr);
        eprintln!("binary failed with {args:?}\nstderr:\n{stderr_str}\n");
    }
    output.status.success()
}

fn fresh_dir(name: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    test_dir
}

#[test]
fn basic_workflow() {
    let test_dir = fresh_dir("basic_workflow");
    write_config(&test_dir, 80, 12);

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    // Leftovers of a previous run are cleared.
    let frames_dir = test_dir.join("frames");
    fs::create_dir(&frames_dir).expect("failed to create frames directory");
    fs::write(frames_dir.join("frame-000099.png"), b"stale").expect("failed to write stale frame");

    assert!(run_bin(&["--sim-dir", test_dir_str, "run"]));

    let mut frames: Vec<_> = fs::read_dir(&frames_dir)
        .expect("failed to read frames directory")
        .map(|entry| entry.expect("failed to read entry").file_name())
        .collect();
    frames.sort();
    assert_eq!(frames.len(), 12);
    assert_eq!(frames[0], "frame-000000.png");
    assert_eq!(frames[11], "frame-000011.png");
    assert!(test_dir.join("trajectory.msgpack").is_file());
    assert!(!test_dir.join("movie.mp4").exists());

    // Editing the config after the run does not change what the run recorded.
    let config_path = test_dir.join("config.toml");
    let config_contents = fs::read_to_string(&config_path).expect("failed to read config file");
    let config_contents = config_contents
        .replace("quantity = 80", "quantity = 90")
        .replace("infected_rate = 0.05", "infected_rate = 0.5");
    fs::write(&config_path, config_contents).expect("failed to write config file");

    assert!(run_bin(&["--sim-dir", test_dir_str, "analyze"]));

    let results =
        fs::read_to_string(test_dir.join("results.json")).expect("failed to read results");
    let results: serde_json::Value = serde_json::from_str(&results).expect("invalid results");
    assert_eq!(results[0]["quantity"], 80);
    assert_eq!(results[0]["initial_infected_count"], 4);
    assert_eq!(results[1]["n_steps"], 12);
    let final_rate = results[1]["final_infection_rate"]
        .as_f64()
        .expect("missing final rate");
    assert!((0.05..=1.0).contains(&final_rate));

    assert!(run_bin(&["--sim-dir", test_dir_str, "clean"]));
    assert!(!frames_dir.exists());
    assert!(!test_dir.join("trajectory.msgpack").exists());
    assert!(!test_dir.join("results.json").exists());
    assert!(test_dir.join("config.toml").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn single_agent_is_fully_infected_from_the_start() {
    let test_dir = fresh_dir("single_agent");
    write_config(&test_dir, 1, 3);
    let test_dir_str = test_dir.to_str().expect("invalid test directory");

    assert!(run_bin(&["--sim-dir", test_dir_str, "run"]));
    assert!(run_bin(&["--sim-dir", test_dir_str, "analyze"]));

    let results =
        fs::read_to_string(test_dir.join("results.json")).expect("failed to read results");
    let results: serde_json::Value = serde_json::from_str(&results).expect("invalid results");
    assert_eq!(results[1]["final_infection_rate"], 1.0);
    assert_eq!(results[3]["fully_infected_step"], 0);

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_is_rejected() {
    let test_dir = fresh_dir("invalid_config");
    write_config(&test_dir, 0, 3);
    let test_dir_str = test_dir.to_str().expect("invalid test directory");

    assert!(!run_bin(&["--sim-dir", test_dir_str, "run"]));
    assert!(!test_dir.join("frames").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn analyze_requires_a_previous_run() {
    let test_dir = fresh_dir("analyze_without_run");
    write_config(&test_dir, 10, 3);
    let test_dir_str = test_dir.to_str().expect("invalid test directory");

    assert!(!run_bin(&["--sim-dir", test_dir_str, "analyze"]));

    fs::remove_dir_all(&test_dir).ok();
}
