use std::time::Duration;

#[gochan::start]
fn main() -> Result<(), gochan::Error<std::convert::Infallible>> {
    gochan::time::sleep(Duration::from_millis(1))?;
    Ok(())
}
