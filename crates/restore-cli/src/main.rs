use restore_cli::cli;

#[tokio::main]
async fn main() {
    let matches = cli::command().get_matches();

    match cli::dispatch(&matches).await {
        Ok(succeeded) => std::process::exit(if succeeded { 0 } else { 1 }),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
