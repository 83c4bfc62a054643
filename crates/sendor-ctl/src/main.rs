//! sendor-ctl — command-line interface for the sendor daemon.

use anyhow::{Context, Result};

mod cmd;

const DEFAULT_PORT: u16 = 9090;

fn print_usage() {
    println!("Usage: sendor-ctl [--port <port>] <command>");
    println!();
    println!("Stash");
    println!("  stash                           List stashed files");
    println!("  stash lock <id>                 Lock an entry against removal");
    println!("  stash unlock <id>               Release a lock taken with `stash lock`");
    println!("  stash remove <id>               Remove an unlocked entry");
    println!();
    println!("Distribution");
    println!("  targets                         List configured delivery targets");
    println!("  distribute <id> <target>        Distribute a stashed file to a target");
    println!("  distribute <id> <target> <method>  ...using a specific distribution method");
    println!();
    println!("Tasks");
    println!("  tasks                           List all tasks");
    println!("  tasks get <task_id>             Show one task's progress");
    println!("  tasks cancel <task_id>          Cancel a pending or running task");
    println!("  tasks remove <task_id>          Delete a terminal task");
    println!();
    println!(
        "Options:\n  --port <port>                   API port (default: {})",
        DEFAULT_PORT
    );
    println!();
    println!("Examples:");
    println!("  sendor-ctl stash");
    println!("  sendor-ctl distribute 3 web-1");
    println!("  sendor-ctl distribute 3 web-1 parallel_sftp");
    println!("  sendor-ctl tasks");
    println!("  sendor-ctl tasks cancel 7");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args.get(i).context("--port requires a value")?.parse().context("--port must be a number")?;
        } else {
            remaining.push(args[i].clone());
        }
        i += 1;
    }

    let remaining_refs: Vec<&str> = remaining.iter().map(|s| s.as_str()).collect();

    if remaining_refs.first() == Some(&"distribute") && remaining_refs.len() >= 3 {
        let entry_id = remaining_refs[1];
        let target = remaining_refs[2];
        let method = remaining_refs.get(3).copied();
        return cmd::tasks::cmd_distribute(port, entry_id, target, method).await;
    }

    match remaining_refs.as_slice() {
        ["stash"] | [] => cmd::stash::cmd_stash_list(port).await,
        ["stash", "lock", id] => cmd::stash::cmd_stash_lock(port, id).await,
        ["stash", "unlock", id] => cmd::stash::cmd_stash_unlock(port, id).await,
        ["stash", "remove", id] => cmd::stash::cmd_stash_remove(port, id).await,
        ["targets"] => cmd::tasks::cmd_targets_list(port).await,
        ["tasks"] => cmd::tasks::cmd_tasks_list(port).await,
        ["tasks", "get", id] => cmd::tasks::cmd_tasks_get(port, id).await,
        ["tasks", "cancel", id] => cmd::tasks::cmd_tasks_cancel(port, id).await,
        ["tasks", "remove", id] => cmd::tasks::cmd_tasks_remove(port, id).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
