use predicates::prelude::*;

#[test]
fn completions_command_outputs_bash_script() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("team_forecasts");
    cmd.args(["completions", "bash"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("team_forecasts"));
}

#[test]
fn completions_command_rejects_unknown_shell() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("team_forecasts");
    cmd.args(["completions", "cmd.exe"]);

    cmd.assert().failure();
}
