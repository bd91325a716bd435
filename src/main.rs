//! StickyDraft entry point
//!
//! On the web the library's `StickyDraft` binding is the entry point. The
//! native binary inspects a board store kept as JSON files in a directory.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;

    use clap::{Parser, Subcommand};
    use stickydraft::platform::{FileStorage, KeyValueStore};
    use stickydraft::{BoardStore, Settings};

    /// Inspect and maintain a file-backed StickyDraft store
    #[derive(Debug, Parser)]
    #[command(name = "stickydraft", version, about)]
    pub struct Cli {
        /// Directory holding one JSON file per storage key
        #[arg(default_value = "stickydraft-data")]
        pub data_dir: PathBuf,

        #[command(subcommand)]
        pub command: Option<Command>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
    pub enum Command {
        /// Print every board and its notes (default)
        Show,
        /// Discard all boards and start over with one empty board
        Reset,
        /// Switch between the light and dark theme
        Theme,
        /// Wipe the directory, keeping only the theme
        Clear,
    }

    pub fn run(cli: Cli) {
        log::info!("StickyDraft (native) using {}", cli.data_dir.display());

        let storage = FileStorage::new(&cli.data_dir);
        let settings = Settings::load(&storage);
        let mut store = BoardStore::open(storage, settings);

        match cli.command.unwrap_or(Command::Show) {
            Command::Show => {}
            Command::Reset => store.reset(),
            Command::Clear => store.clear_all(),
            Command::Theme => {
                let theme = store.toggle_theme();
                println!("Theme: {}", theme.as_str());
            }
        }

        print_summary(&store);
    }

    fn print_summary<S: KeyValueStore>(store: &BoardStore<S>) {
        println!("Theme: {}", store.theme().as_str());
        for board in store.tabs() {
            let marker = if store.active_tab_id() == Some(board.id.as_str()) {
                "*"
            } else {
                " "
            };
            println!("{} {} [{}] ({} notes)", marker, board.title, board.id, board.notes.len());
            for note in &board.notes {
                let title = if note.title.is_empty() { "(untitled)" } else { note.title.as_str() };
                println!(
                    "    {} at ({}, {}) z={} {}",
                    title,
                    note.x,
                    note.y,
                    note.z_index,
                    note.color.as_css()
                );
            }
        }
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::init();
    cli::run(cli::Cli::parse());
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is `stickydraft::web::start`, this is just to satisfy the compiler
}
