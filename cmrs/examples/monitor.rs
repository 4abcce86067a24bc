use std::cell::RefCell;

use cmrs::ConnMan;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> cmrs::Result<()> {
    let cm = ConnMan::new().await?;
    let state = RefCell::new(cm.load_state().await?);
    let (_stop, shutdown) = watch::channel(());

    println!("Watching ConnMan, press Ctrl-C to quit");
    cm.monitor(shutdown, move |event| {
        for change in state.borrow_mut().apply(event) {
            println!("{change:?}");
        }
    })
    .await
}
