use std::sync::mpsc;
use std::thread;

use gochan::sync::WaitGroup;
use gochan::{go, Channel};

pub fn create_destroy_gochan() -> Channel<u64> {
    Channel::bounded(16)
}

pub fn create_destroy_std() -> (mpsc::SyncSender<u64>, mpsc::Receiver<u64>) {
    mpsc::sync_channel(16)
}

/// Single thread filling and draining a buffer.
pub fn buffered_same_thread_gochan(messages: u64) -> u64 {
    let channel = Channel::bounded(messages as usize);
    for message in 0..messages {
        channel.send(message);
    }
    channel.close();

    channel.iter().sum()
}

pub fn buffered_same_thread_std(messages: u64) -> u64 {
    let (sender, receiver) = mpsc::sync_channel(messages as usize);
    for message in 0..messages {
        sender.send(message).unwrap();
    }
    drop(sender);

    receiver.iter().sum()
}

/// Producer streaming values to a consumer.
pub fn ping_pong_gochan(messages: u64, capacity: usize) -> u64 {
    let channel = Channel::bounded(capacity);

    let producer = go({
        let channel = channel.clone();
        move || {
            for message in 0..messages {
                channel.send(message);
            }
            channel.close();
        }
    });

    let sum = channel.iter().sum();
    producer.join().unwrap();
    sum
}

pub fn ping_pong_std(messages: u64, capacity: usize) -> u64 {
    let (sender, receiver) = mpsc::sync_channel(capacity);

    let producer = thread::spawn(move || {
        for message in 0..messages {
            sender.send(message).unwrap();
        }
    });

    let sum = receiver.iter().sum();
    producer.join().unwrap();
    sum
}

/// Several producers contending on one channel.
pub fn fan_in_gochan(producers: u64, messages: u64) -> u64 {
    let channel = Channel::bounded(64);
    let wait_group = WaitGroup::new(producers as usize);

    for _ in 0..producers {
        let channel = channel.clone();
        let wait_group = wait_group.clone();
        go(move || {
            for message in 0..messages {
                channel.send(message);
            }
            wait_group.done();
        });
    }

    go({
        let channel = channel.clone();
        move || {
            wait_group.wait();
            channel.close();
        }
    });

    channel.iter().sum()
}
