//! Fixed names shared by the repository, the engine and the CLI

/// Directory (inside the executable dir) holding the original binaries.
pub const BACKUP_DIR_NAME: &str = "ffmpeg_backup_original";

/// Directory name of the prebuilt variant store when not configured.
pub const VARIANT_STORE_DIR: &str = "ffmpeg_binaries";

/// Architecture-sensitive binaries; the first entry is the primary transcoder.
pub const DEFAULT_BINARIES: [&str; 3] = ["ffmpeg", "ffprobe", "ffdetect"];

/// Executable directory candidates relative to the bundle root, in probe order.
pub const DEFAULT_EXECUTABLE_DIRS: [&str; 6] = [
    "Contents/MacOS",
    "Contents/Resources/ffmpeg",
    "Contents/Resources",
    "ffmpeg",
    "bin",
    ".",
];

/// Well-known install locations of the media server.
pub const DEFAULT_SEARCH_PATHS: [&str; 3] = [
    "/Applications/EmbyServer.app",
    "/Applications/Emby Server.app",
    "/opt/emby-server",
];

pub const JOURNAL_FILE_NAME: &str = "operations.jsonl";

pub const CONFIG_DIR_NAME: &str = "archfix";
