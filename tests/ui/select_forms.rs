use gochan::{select, Channel};

fn main() {
    let numbers = Channel::bounded(1);
    let words = Channel::<&str>::bounded(1);

    // send only, trailing comma
    select! {
        send(numbers, 1) => (),
    }

    // no trailing comma
    let doubled = select! {
        recv(numbers) -> n => n.unwrap_or(0) * 2,
        recv(words) -> _ => 0
    };
    assert_eq!(doubled, 2);

    // mixed cases and default
    let outcome = select! {
        recv(numbers) -> _ => "number",
        send(words, "hi") => "word",
        default => "default",
    };
    assert_eq!(outcome, "word");

    // default alone
    let fallback = select! { default => 7 };
    assert_eq!(fallback, 7);
}
