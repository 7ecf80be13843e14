//! Print the stored conversation of one user.
//!
//! Usage: cargo run --bin history <history.db> <user_id>

use std::path::Path;

use geminichat::chatbot::Database;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <history.db> <user_id>", args[0]);
        eprintln!();
        eprintln!("Print every stored turn of one user, oldest first.");
        eprintln!("For Telegram DMs the user id is the chat id.");
        std::process::exit(1);
    }

    let db_path = Path::new(&args[1]);
    if !db_path.exists() {
        eprintln!("No database at {:?}", db_path);
        std::process::exit(1);
    }
    let user_id: i64 = match args[2].parse() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Invalid user_id: {}", args[2]);
            std::process::exit(1);
        }
    };

    let db = match Database::open(db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open {:?}: {e}", db_path);
            std::process::exit(1);
        }
    };

    let turns = match db.list_turns(user_id) {
        Ok(turns) => turns,
        Err(e) => {
            eprintln!("Failed to read history: {e}");
            std::process::exit(1);
        }
    };

    if turns.is_empty() {
        println!("No history for user {user_id}");
        return;
    }

    for turn in &turns {
        println!("{}", turn.format());
    }
    println!();
    println!("{} turn(s)", turns.len());
}
