pub mod appearance;
pub mod preferences;

pub use appearance::{
    EditorConfig, EditorConfigPatch, Layout, LayoutParseError, Theme, ThemeParseError,
};
pub use preferences::{
    MemoryPreferences, PreferenceStorage, Preferences, PreferencesError, PreferencesStore,
};
