mod common;

use common::{Scratch, fixture_path, run, stdout_json};

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// version / validate
// ============================================================================

#[test]
fn version_human() {
    let output = run(&["version"]);
    assert!(output.status.success(), "version should exit 0: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.starts_with("rostrum "), "unexpected version output: {out}");
    assert!(out.contains('.'), "version output should contain a version: {out}");
}

#[test]
fn version_json() {
    let output = run(&["version", "--format", "json"]);
    assert!(output.status.success());
    let parsed = stdout_json(&output);
    assert_eq!(parsed["name"], "rostrum");
    assert!(parsed.get("version").is_some());
    assert_eq!(parsed["policies"].as_array().unwrap().len(), 5);
}

#[test]
fn validate_fixture() {
    let config = fixture_path("tournament.yaml");
    let output = run(&["validate", "--format", "json", config.to_str().unwrap()]);
    assert!(output.status.success(), "validate failed: {}", stderr(&output));

    let parsed = stdout_json(&output);
    assert_eq!(parsed[0]["valid"], true);
    assert_eq!(parsed[0]["phases"].as_array().unwrap().len(), 4);
    assert_eq!(parsed[0]["warnings"].as_array().unwrap().len(), 0);
}

#[test]
fn validate_unknown_source_phase() {
    let config = fixture_path("invalid_unknown_phase.yaml");
    let output = run(&["validate", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(
        stderr(&output).contains("Fase de Grupo"),
        "error should name the phase: {}",
        stderr(&output)
    );
}

#[test]
fn validate_strict_rejects_warnings() {
    let config = fixture_path("warning_alias.yaml");
    let relaxed = run(&["validate", config.to_str().unwrap()]);
    assert!(relaxed.status.success(), "{}", stderr(&relaxed));

    let strict = run(&["validate", "--strict", config.to_str().unwrap()]);
    assert_eq!(strict.status.code(), Some(64));
}

#[test]
fn validate_missing_file() {
    let output = run(&["validate", "/tmp/nonexistent_rostrum_tournament.yaml"]);
    assert!(!output.status.success());
}

// ============================================================================
// Read commands
// ============================================================================

#[test]
fn result_of_decided_round() {
    let scratch = Scratch::new();
    let output = scratch.run("result", &["Ronda 1", "--format", "json"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let parsed = stdout_json(&output);
    assert_eq!(parsed["winner"], "TeamA");
    assert_eq!(parsed["isTie"], false);
    assert_eq!(parsed["resolution"]["status"], "decided");
    assert_eq!(parsed["resolution"]["score"], 15);
}

#[test]
fn result_of_tied_round_human() {
    let scratch = Scratch::new();
    let output = scratch.run("result", &["Cuartos 1"]);
    assert!(output.status.success());
    assert!(
        stdout(&output).contains("tied at 13"),
        "unexpected output: {}",
        stdout(&output)
    );
}

#[test]
fn result_of_unknown_round_suggests() {
    let scratch = Scratch::new();
    let output = scratch.run("result", &["Ronda 9"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("did you mean"), "{}", stderr(&output));
}

#[test]
fn standings_through_alias() {
    let scratch = Scratch::new();
    let output = scratch.run("standings", &["Grupos", "--format", "json"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let parsed = stdout_json(&output);
    assert_eq!(parsed["phase"], "Fase de Grupos");
    let rows = parsed["rows"].as_array().unwrap();
    let top: Vec<_> = rows
        .iter()
        .map(|r| (r["team"].as_str().unwrap(), r["total"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        top,
        [
            ("TeamA", 30),
            ("TeamB", 28),
            ("TeamC", 25),
            ("TeamD", 10),
            ("TeamE", 5)
        ]
    );
}

#[test]
fn qualify_open_semifinal() {
    let scratch = Scratch::new();
    let output = scratch.run("qualify", &["Semifinal 1", "--format", "json"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let parsed = stdout_json(&output);
    assert_eq!(parsed["determined"], false);
    assert_eq!(parsed["policy"], "winners_of");
    assert_eq!(parsed["slots"][0]["status"], "tied");
    assert_eq!(parsed["slots"][1]["status"], "pending");
}

#[test]
fn bracket_highlights_active_round() {
    let scratch = Scratch::new();
    let output = scratch.run("bracket", &["--format", "json"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let parsed = stdout_json(&output);
    assert_eq!(parsed["highlight"]["round"], "Cuartos 1");
    assert_eq!(parsed["highlight"]["kind"], "current");
    let phases: Vec<_> = parsed["phases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(phases[0], "Fase de Grupos");
    assert!(phases.contains(&"Exhibición"));
}

#[test]
fn malformed_data_file() {
    let config = fixture_path("tournament.yaml");
    let data = fixture_path("malformed.json");
    let output = run(&[
        "bracket",
        "-c",
        config.to_str().unwrap(),
        "-d",
        data.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(4));
}

// ============================================================================
// Write commands
// ============================================================================

#[test]
fn bye_is_saved_once() {
    let scratch = Scratch::new();
    let first = scratch.run("bye", &["Semifinal 1", "TeamB"]);
    assert!(first.status.success(), "{}", stderr(&first));

    let stored = scratch.snapshot();
    assert!(
        stored
            .scores
            .iter()
            .any(|s| s.match_id == "Semifinal 1-bye-TeamB" && s.is_system())
    );

    let second = scratch.run("bye", &["Semifinal 1", "TeamB"]);
    assert_eq!(second.status.code(), Some(5));
    assert!(stderr(&second).contains("already been confirmed"));
    assert_eq!(scratch.snapshot().scores.len(), stored.scores.len());
}

#[test]
fn bye_for_unverified_team_is_refused() {
    let scratch = Scratch::new();
    let output = scratch.run("bye", &["Semifinal 1", "TeamX"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn tiebreak_with_hand_thrown_dice() {
    let scratch = Scratch::new();
    let events = scratch.events();
    let output = scratch.run(
        "tiebreak",
        &[
            "Cuartos 1",
            "--dice",
            "2,4",
            "--format",
            "json",
            "--events",
            events.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let parsed = stdout_json(&output);
    assert_eq!(parsed["winner"], "TeamD");
    assert_eq!(parsed["score"], 13);
    assert_eq!(parsed["throws"].as_array().unwrap().len(), 1);

    let result = scratch.run("result", &["Cuartos 1", "--format", "json"]);
    assert_eq!(stdout_json(&result)["winner"], "TeamD");

    let log = std::fs::read_to_string(&events).unwrap();
    let types: Vec<String> = log
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["type"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(types, ["TieDetected", "DiceRolled", "TieBreakConfirmed"]);

    let again = scratch.run("tiebreak", &["Cuartos 1", "--seed", "7"]);
    assert_eq!(again.status.code(), Some(5));
}

#[test]
fn tiebreak_with_tied_dice_saves_nothing() {
    let scratch = Scratch::new();
    let before = scratch.snapshot();
    let output = scratch.run("tiebreak", &["Cuartos 1", "--dice", "3,3"]);
    assert_eq!(output.status.code(), Some(64));
    assert_eq!(scratch.snapshot(), before);
}

#[test]
fn tiebreak_rejects_faces_not_on_the_die() {
    let scratch = Scratch::new();
    let before = scratch.snapshot();
    for faces in ["9,2", "0,3"] {
        let output = scratch.run("tiebreak", &["Cuartos 1", "--dice", faces]);
        assert_eq!(output.status.code(), Some(64), "{faces}: {}", stderr(&output));
        assert!(stderr(&output).contains("6-sided"), "{}", stderr(&output));
        assert_eq!(scratch.snapshot(), before);
    }
}

#[test]
fn tiebreak_with_seed_always_settles() {
    let scratch = Scratch::new();
    let output = scratch.run("tiebreak", &["Cuartos 1", "--seed", "42", "--format", "json"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let winner = stdout_json(&output)["winner"].as_str().unwrap().to_owned();
    assert!(winner == "TeamA" || winner == "TeamD");
}

#[test]
fn tiebreak_on_decided_round_fails() {
    let scratch = Scratch::new();
    let output = scratch.run("tiebreak", &["Ronda 1"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn activate_computed_lineup() {
    let scratch = Scratch::new();
    let output = scratch.run("activate", &["Cuartos 2"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Cuartos 2 is now active: TeamB, TeamC"));

    let state = scratch.snapshot().debate_state;
    assert_eq!(state.current_round.as_deref(), Some("Cuartos 2"));
    assert_eq!(state.team_names(), ["TeamB", "TeamC"]);
    assert_eq!(state.extra["timerSeconds"], 420);
}

#[test]
fn activate_undetermined_round_requires_teams() {
    let scratch = Scratch::new();
    let refused = scratch.run("activate", &["Semifinal 1"]);
    assert_eq!(refused.status.code(), Some(5));

    let forced = scratch.run(
        "activate",
        &["Semifinal 1", "--team", "TeamA", "--team", "TeamB", "--format", "json"],
    );
    assert!(forced.status.success(), "{}", stderr(&forced));
    let parsed = stdout_json(&forced);
    assert_eq!(parsed["mismatch"]["undetermined"], true);
    assert_eq!(
        scratch.snapshot().debate_state.current_round.as_deref(),
        Some("Semifinal 1")
    );
}
