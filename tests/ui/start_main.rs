use gochan::{go, Channel};

#[gochan::start]
fn main() {
    let channel = Channel::unbuffered();

    go({
        let channel = channel.clone();
        move || channel.send(gochan::runtime::current_id())
    });

    let sender = channel.recv().unwrap();
    assert_ne!(sender, gochan::runtime::current_id());
}
