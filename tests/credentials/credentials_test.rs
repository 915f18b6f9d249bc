//! Coverage for credential file loading and permission checks.

use std::fs;
use std::path::PathBuf;

use wechat_notify::credentials::load_env_file;

fn write_env(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join(".env");
    let write = fs::write(&path, contents);
    assert!(write.is_ok());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::set_permissions(&path, fs::Permissions::from_mode(0o600));
        assert!(perms.is_ok());
    }

    path
}

#[test]
fn loads_corp_id_and_secret() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_env(&dir, "WECHAT_CORP_ID=ww123\nWECHAT_SECRET=abc456\nOTHER=x\n");

    let loaded = load_env_file(&path);
    assert!(loaded.is_ok());
    let env = match loaded {
        Ok(env) => env,
        Err(err) => panic!("env file should load: {err}"),
    };

    assert_eq!(env.corp_id(), Some("ww123"));
    assert_eq!(env.secret(), Some("abc456"));
    assert_eq!(env.get("OTHER"), Some("x"));
    assert!(!format!("{env:?}").contains("abc456"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    assert!(load_env_file(&dir.path().join(".env")).is_err());
}

#[cfg(unix)]
#[test]
fn rejects_world_readable_env_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_env(&dir, "WECHAT_CORP_ID=ww123\nWECHAT_SECRET=abc456\n");
    let perms = fs::set_permissions(&path, fs::Permissions::from_mode(0o644));
    assert!(perms.is_ok());

    assert!(load_env_file(&path).is_err());
}
