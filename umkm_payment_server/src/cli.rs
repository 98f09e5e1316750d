use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // UMS_JWT_SECRET and UMS_MIDTRANS_SERVER_KEY are deliberately absent
    const DISPLAY_ENVS: [&str; 9] = [
        "RUST_LOG",
        "UMS_HOST",
        "UMS_PORT",
        "UMS_DATABASE_URL",
        "UMS_MIDTRANS_IP_WHITELIST",
        "UMS_USE_X_FORWARDED_FOR",
        "UMS_USE_FORWARDED",
        "UMS_MIN_WITHDRAWAL",
        "UMS_EVENT_BUFFER_SIZE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
