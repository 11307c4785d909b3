#[tokio::main]
async fn main() {
    if let Err(err) = mytodo_notifier_lib::run().await {
        eprintln!("mytodo-notifier: {err}");
        std::process::exit(1);
    }
}
