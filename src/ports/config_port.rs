//! Configuration access port trait.
//!
//! Sections read by the application: `[backtest]`, `[optimizer]`,
//! `[scoring]` and `[data]`.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
