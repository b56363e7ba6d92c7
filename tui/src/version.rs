/// The writeup CLI version.
///
/// Release builds may inject the tag version through the `WRITEUP_VERSION` environment variable;
/// otherwise the workspace package version is used.
pub const WRITEUP_VERSION: &str = match option_env!("WRITEUP_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
