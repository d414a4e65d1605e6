use anyhow::Result;

use crate::config::Config;
use crate::runtime::Runtime;

/// Print the interpreter environment as `KEY=VALUE` lines.
pub fn env<R: Runtime>(config: &Config<R>) -> Result<()> {
    for (key, value) in environment(config) {
        println!("{}={}", key, value);
    }
    Ok(())
}

fn environment<R: Runtime>(config: &Config<R>) -> Vec<(String, String)> {
    config
        .descriptor
        .environment_variables(&config.layout.home, &config.layout.extras_root)
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::path::PathBuf;

    #[test]
    fn test_environment_for_python() {
        let config =
            Config::new(MockRuntime::new(), Some(PathBuf::from("/sdcard/py4a")), "python", None, None)
                .unwrap();
        let vars = environment(&config);

        assert_eq!(vars.len(), 7);
        assert!(vars.contains(&("PYTHONHOME".to_string(), "/sdcard/py4a/python".to_string())));
        assert!(vars.contains(&("PY4A_EXTRAS".to_string(), "/sdcard/py4a/extras".to_string())));
        assert!(vars.contains(&("TEMP".to_string(), "/sdcard/py4a/extras/python/tmp".to_string())));
    }
}
