// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command slot handshake tests over a lossy link

use std::collections::VecDeque;

use robolink::protocol::{Frame, Handshake, Record};

struct Side {
    hs: Handshake,
    frame: Frame,
    pending: VecDeque<Record>,
    received: Vec<Record>,
}

impl Side {
    fn new(commands: &[Record]) -> Self {
        Self {
            hs: Handshake::new(),
            frame: Frame::new(),
            pending: commands.iter().copied().collect(),
            received: Vec::new(),
        }
    }

    fn transmit(&mut self) -> Frame {
        let command = if self.hs.can_send() {
            self.pending.pop_front()
        } else {
            None
        };
        assert!(self.hs.prepare(&mut self.frame, command, false).is_ok());
        self.frame
    }

    fn receive(&mut self, frame: &Frame) {
        if let Some(record) = self.hs.receive(frame) {
            self.received.push(record);
        }
    }
}

fn commands(n: u8) -> Vec<Record> {
    (1..=n).map(|i| Record::new(0x90, i, 0, 0)).collect()
}

/// Exchange frames for `rounds` periods. `lose_out`/`lose_back` drop a frame in either direction
/// and `replay` delivers the host's frame twice.
fn run(
    host: &mut Side,
    robot: &mut Side,
    rounds: usize,
    lose_out: impl Fn(usize) -> bool,
    lose_back: impl Fn(usize) -> bool,
    replay: impl Fn(usize) -> bool,
) {
    for r in 0..rounds {
        let out = host.transmit();
        if !lose_out(r) {
            robot.receive(&out);
            if replay(r) {
                robot.receive(&out);
            }
        }
        let back = robot.transmit();
        if !lose_back(r) {
            host.receive(&back);
        }
    }
}

#[test]
fn test_clean_link_delivers_every_command_once() {
    let sent = commands(6);
    let mut host = Side::new(&sent);
    let mut robot = Side::new(&[]);
    run(&mut host, &mut robot, 20, |_| false, |_| false, |_| false);

    assert_eq!(robot.received, sent);
    assert!(host.pending.is_empty());
    assert!(host.received.is_empty());
}

#[test]
fn test_lost_and_replayed_frames_deliver_exactly_once_in_order() {
    let sent = commands(8);
    let mut host = Side::new(&sent);
    let mut robot = Side::new(&[]);
    run(
        &mut host,
        &mut robot,
        80,
        |r| r % 3 == 1,
        |r| r % 4 == 2,
        |r| r % 5 == 0,
    );

    assert_eq!(robot.received, sent);
}

#[test]
fn test_both_directions_at_once() {
    let to_robot = commands(5);
    let to_host: Vec<Record> = (1..=5).map(|i| Record::new(0xFF, i, 0, 0)).collect();
    let mut host = Side::new(&to_robot);
    let mut robot = Side::new(&to_host);
    run(&mut host, &mut robot, 60, |r| r % 7 == 3, |r| r % 6 == 4, |_| false);

    assert_eq!(robot.received, to_robot);
    assert_eq!(host.received, to_host);
}

#[test]
fn test_sender_holds_while_the_link_is_down() {
    let sent = commands(3);
    let mut host = Side::new(&sent);
    let mut robot = Side::new(&[]);

    // Nothing comes back, so only the first command is ever loaded.
    run(&mut host, &mut robot, 10, |_| false, |_| true, |_| false);
    assert_eq!(robot.received, sent[..1].to_vec());
    assert_eq!(host.pending.len(), 2);

    // Link restored: the rest follows without repeating the first.
    run(&mut host, &mut robot, 10, |_| false, |_| false, |_| false);
    assert_eq!(robot.received, sent);
}
