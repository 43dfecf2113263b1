//! Secret reference resolver.
//!
//! The Google `access_token` in `config.toml` may point at a secret kept
//! outside the file:
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the value of `$VAR_NAME`
//! - anything else is used as the token itself

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix("pass::") {
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        resolve_env(var)
    } else {
        Ok(value.to_string())
    }
}

/// Runs `pass show <path>` and returns the first line of stdout.
fn resolve_pass(path: &str) -> Result<String, String> {
    let output = std::process::Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`pass show {}` failed (exit {}): {}",
            path,
            output.status,
            stderr.trim()
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

/// Reads an environment variable.
fn resolve_env(var: &str) -> Result<String, String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(format!("environment variable `{}` is empty", var)),
        Err(_) => Err(format!("environment variable `{}` is not set", var)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passthrough() {
        assert_eq!(resolve("hello").unwrap(), "hello");
        assert_eq!(resolve("").unwrap(), "");
        assert_eq!(
            resolve("ya29.plain-token").unwrap(),
            "ya29.plain-token"
        );
    }

    #[test]
    fn env_prefix_resolves() {
        unsafe {
            std::env::set_var("_CIKE_TEST_SECRET", "my-secret-value");
        }
        assert_eq!(
            resolve("env::_CIKE_TEST_SECRET").unwrap(),
            "my-secret-value"
        );
        unsafe {
            std::env::remove_var("_CIKE_TEST_SECRET");
        }
    }

    #[test]
    fn env_prefix_missing_var_errors() {
        let result = resolve("env::_CIKE_NONEXISTENT_VAR_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("not set"));
    }

    #[test]
    fn env_prefix_empty_var_errors() {
        unsafe {
            std::env::set_var("_CIKE_TEST_EMPTY_SECRET", "  ");
        }
        let result = resolve("env::_CIKE_TEST_EMPTY_SECRET");
        assert!(result.unwrap_err().contains("empty"));
        unsafe {
            std::env::remove_var("_CIKE_TEST_EMPTY_SECRET");
        }
    }

    #[test]
    fn pass_prefix_missing_entry_errors() {
        // Fails whether or not `pass` is installed.
        let result = resolve("pass::nonexistent/entry/that/should/not/exist/12345");
        assert!(result.is_err());
    }
}
