use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use relationdb::sql::canonical;
use relationdb::{Config, Database};

fn main() -> ExitCode {
    env_logger::init();

    let env_dir = match std::env::args().nth(1) {
        Some(dir) => dir,
        None => {
            eprintln!("usage: relationdb <env_dir>");
            return ExitCode::FAILURE;
        }
    };

    let mut db = match Database::open(Config::file(&env_dir)) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error: failed to open database at {}: {}", env_dir, e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") {
            return ExitCode::SUCCESS;
        }
        if trimmed.eq_ignore_ascii_case("test") {
            println!("{}", if run_self_tests(&mut db) { "ok" } else { "failed" });
            continue;
        }

        match db.parse(trimmed) {
            Ok((stmt, _)) => {
                println!("{}", canonical(&stmt));
                match db.execute(&stmt) {
                    Ok(result) => println!("{}", result),
                    Err(e) => println!("Error: {}", e),
                }
            }
            Err(e) => println!("Error: {}", e),
        }
        println!();
        let _ = stdout.flush();
    }

    ExitCode::SUCCESS
}

/// A minimal in-process smoke test exercised by the `test` REPL word: a
/// round-trip through the surface the seed tests in the test suite cover.
fn run_self_tests(db: &mut Database) -> bool {
    let mut probe = || -> relationdb::DbResult<()> {
        db.run("CREATE TABLE _selftest (a INT, b TEXT)")?;
        db.run("INSERT INTO _selftest VALUES (1, 'hello')")?;
        let result = db.run("SELECT * FROM _selftest")?;
        match result {
            relationdb::QueryResult::Rows { rows, .. } if rows.len() == 1 => {}
            _ => return Err(relationdb::DbError::InvalidArgument("self-test row mismatch".to_string())),
        }
        db.run("DELETE FROM _selftest WHERE a = 1")?;
        db.run("DROP TABLE _selftest")?;
        Ok(())
    };
    probe().is_ok()
}
