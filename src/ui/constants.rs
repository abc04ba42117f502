pub(crate) const MODAL_WIDTH_PERCENT: u16 = 70;
pub(crate) const ERROR_WIDTH_PERCENT: u16 = 50;

pub(crate) const POPUP_MIN_WIDTH: u16 = 10;
pub(crate) const POPUP_MIN_HEIGHT: u16 = 5;

pub(crate) const MAX_COMPLETIONS_SHOWN: usize = 8;

pub(crate) const ACTION_KEYS: &str = "ceos";
pub(crate) const ACTION_DEFAULT_KEY: char = 'c';
pub(crate) const CONFLICT_KEYS: &str = "anor";
pub(crate) const CONFLICT_DEFAULT_KEY: char = 'a';
