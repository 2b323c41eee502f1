//! Every test here mutates the process environment, so they all run serially
//! in their own test binary.

use serial_test::serial;
use std::io::Write;

struct EnvGuard {
    restores: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn apply(pairs: &[(&str, &str)]) -> Self {
        let mut restores = Vec::new();
        for (key, value) in pairs {
            restores.push((key.to_string(), std::env::var(key).ok()));
            // SAFETY: tests in this binary are serialized and spawn no threads
            unsafe { std::env::set_var(key, value) };
        }
        EnvGuard { restores }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, previous) in self.restores.iter().rev() {
            // SAFETY: see `EnvGuard::apply`
            unsafe {
                match previous {
                    Some(val) => std::env::set_var(key, val),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}

fn cfg() -> (i32, serde_json::Value) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = introspect_cli::run(["introspect", "cfg"], &mut out, &mut err);
    let value = if code == 0 {
        serde_json::from_slice(&out).expect("cfg JSON")
    } else {
        serde_json::Value::Null
    };
    (code, value)
}

#[test]
#[serial]
fn defaults_apply_without_configuration() {
    let _env = EnvGuard::apply(&[("INTROSPECT_CONFIG", ""), ("INTROSPECT_QUESTIONS", "")]);
    let (code, value) = cfg();
    assert_eq!(code, 0);
    assert_eq!(value["questions"]["value"], "questions.json");
    assert_eq!(value["questions"]["source"], "default");
}

#[test]
#[serial]
fn config_file_then_environment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "questions = \"/srv/from-file.json\"\nport = 9000").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    {
        let _env = EnvGuard::apply(&[("INTROSPECT_CONFIG", path.as_str()), ("INTROSPECT_QUESTIONS", "")]);
        let (code, value) = cfg();
        assert_eq!(code, 0);
        assert_eq!(value["questions"]["value"], "/srv/from-file.json");
        assert_eq!(value["questions"]["source"], "file");
    }

    let _env = EnvGuard::apply(&[
        ("INTROSPECT_CONFIG", path.as_str()),
        ("INTROSPECT_QUESTIONS", "/srv/from-env.json"),
    ]);
    let (code, value) = cfg();
    assert_eq!(code, 0);
    assert_eq!(value["questions"]["value"], "/srv/from-env.json");
    assert_eq!(value["questions"]["source"], "env");
}

#[test]
#[serial]
fn file_flag_beats_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    let flagged = dir.path().join("flagged.json");
    let _env = EnvGuard::apply(&[
        ("INTROSPECT_CONFIG", ""),
        ("INTROSPECT_QUESTIONS", "/definitely/not/here.json"),
    ]);

    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = introspect_cli::run(
        ["introspect", "add-question", "--en", "Who?", "--file", flagged.to_str().unwrap()],
        &mut out,
        &mut err,
    );
    assert_eq!(code, 0, "{}", String::from_utf8_lossy(&err));
    assert!(flagged.exists());
}

#[test]
#[serial]
fn broken_config_file_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "questions = [").unwrap();
    let path = file.path().to_str().unwrap().to_string();
    let _env = EnvGuard::apply(&[("INTROSPECT_CONFIG", path.as_str())]);

    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = introspect_cli::run(["introspect", "cfg"], &mut out, &mut err);
    assert_eq!(code, 2);
    assert!(String::from_utf8_lossy(&err).contains("Invalid configuration"));
}
