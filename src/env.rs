use std::cell::RefCell;

/// Set to `1` to switch on label mode for files which look labelled.
pub const DETECT_LABELS_VAR: &str = "CARDVM_DETECT_LABELS";
/// Set to `1` to behave as if `--minimal` were always passed.
pub const MINIMAL_VAR: &str = "CARDVM_MINIMAL";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Env {
    detect_labels: bool,
    minimal: bool,
}

thread_local! {
    /// Must only be mutated within `init`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

impl Env {
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = |name: &str| lookup(name).is_some_and(|value| value.trim() == "1");
        Self {
            detect_labels: enabled(DETECT_LABELS_VAR),
            minimal: enabled(MINIMAL_VAR),
        }
    }
}

/// Read configuration from the process environment. Must be called once, before any getter.
pub fn init() {
    let value = Env::from_lookup(|name| std::env::var(name).ok());
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

pub fn is_label_detection_enabled() -> bool {
    with_env(|env| env.detect_labels)
}

pub fn is_minimal_forced() -> bool {
    with_env(|env| env.minimal)
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Env {
        Env::from_lookup(|name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
    }

    #[test]
    fn only_one_enables() {
        assert_eq!(env(&[]), Env::default());
        assert!(env(&[(DETECT_LABELS_VAR, "1")]).detect_labels);
        assert!(!env(&[(DETECT_LABELS_VAR, "true")]).detect_labels);
        assert!(!env(&[(DETECT_LABELS_VAR, "0")]).detect_labels);
        assert_eq!(
            env(&[(MINIMAL_VAR, " 1\n")]),
            Env {
                detect_labels: false,
                minimal: true
            }
        );
    }

    #[test]
    fn init_once_per_thread() {
        std::thread::spawn(|| {
            init();
            // Getters work after initialization
            let _ = is_label_detection_enabled();
            let _ = is_minimal_forced();
        })
        .join()
        .unwrap();
    }
}
