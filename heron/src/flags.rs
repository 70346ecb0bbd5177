use std::path::PathBuf;

xflags::xflags! {
    /// Builds front-end assets: scripts, styles, templates, fonts and media.
    cmd heron {
        /// Tasks to run, one after another. Defaults to `default`.
        repeated task: String
        /// Project root; configuration paths are relative to it.
        optional --root root: PathBuf
        /// Configuration document. Defaults to `config.json` in the root.
        optional --config config: PathBuf
        /// Package document. Defaults to `package.json` in the root.
        optional --package package: PathBuf
        /// Exit with an error if any file failed along the way.
        optional --strict
        /// List the registered tasks and exit.
        optional --tasks
        /// Log file-level activity.
        optional -v, --verbose
    }
}
