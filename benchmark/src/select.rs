use gochan::{go, select, Channel};

/// Select over channels that always have a value buffered.
pub fn ready_gochan(rounds: u64) -> u64 {
    let a = Channel::bounded(1);
    let b = Channel::bounded(1);
    let mut sum = 0;

    for round in 0..rounds {
        if a.is_empty() {
            a.send(round);
        }
        if b.is_empty() {
            b.send(round);
        }

        sum += select! {
            recv(a) -> value => value.unwrap_or(0),
            recv(b) -> value => value.unwrap_or(0),
        };
    }

    sum
}

/// Select that always falls through to its default.
pub fn default_gochan(rounds: u64) -> u64 {
    let a = Channel::<u64>::unbuffered();
    let b = Channel::<u64>::unbuffered();
    let mut defaults = 0;

    for _ in 0..rounds {
        defaults += select! {
            recv(a) -> _ => 0,
            recv(b) -> _ => 0,
            default => 1,
        };
    }

    defaults
}

/// Select that usually parks on both channels before a partner arrives.
pub fn parked_gochan(rounds: u64) -> u64 {
    let a = Channel::unbuffered();
    let b = Channel::unbuffered();

    let producer = go({
        let (a, b) = (a.clone(), b.clone());
        move || {
            for round in 0..rounds {
                if round % 2 == 0 {
                    a.send(round);
                } else {
                    b.send(round);
                }
            }
        }
    });

    let mut sum = 0;
    for _ in 0..rounds {
        sum += select! {
            recv(a) -> value => value.unwrap_or(0),
            recv(b) -> value => value.unwrap_or(0),
        };
    }

    producer.join().unwrap();
    sum
}
