use std::{
    error::Error,
    io::Write,
    path::Path,
    process::{Command, Output, Stdio},
    str,
};

const BIN_PATH: &str = "./target/debug/quantum";

pub struct Expected<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(self, output: &Output) -> Result<(), Box<dyn Error>> {
        assert_eq!(str::from_utf8(&output.stdout)?, self.stdout);
        assert_eq!(str::from_utf8(&output.stderr)?, self.stderr);
        Ok(())
    }
}

fn run_quantum(src_path: &Path) -> Result<Output, std::io::Error> {
    Command::new(BIN_PATH).arg(src_path).output()
}

pub fn check_run(src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = run_quantum(src_path)?;
    expected.assert_matches(&output)?;
    assert!(
        output.status.success(),
        "quantum exited with status {:?}",
        output.status.code()
    );
    Ok(())
}

pub fn check_run_with_input(src_path: &Path, stdin: &str, expected: Expected) -> Result<(), Box<dyn Error>> {
    let mut child = Command::new(BIN_PATH)
        .arg(src_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    child.stdin.take().unwrap().write_all(stdin.as_bytes())?;
    let output = child.wait_with_output()?;
    expected.assert_matches(&output)?;
    Ok(())
}

pub fn check_run_failure(src_path: &Path) -> Result<(), Box<dyn Error>> {
    let output = run_quantum(src_path)?;
    assert!(
        !output.status.success(),
        "quantum should have exited with a non-zero status"
    );
    Ok(())
}

pub fn check_file_check(src_path: &Path) -> Result<(), Box<dyn Error>> {
    let output = Command::new(BIN_PATH)
        .arg("--check")
        .arg(src_path)
        .output()?;
    assert!(
        output.status.success(),
        "quantum --check failed: {}",
        str::from_utf8(&output.stderr)?
    );
    Ok(())
}
