// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Toggle-bit flow control for the command slot of the framed link.
//!
//! Each side owns a DATA bit and an ACK bit in its outgoing config byte. A sender loads a new
//! command only when its DATA bit equals the ACK bit last seen from the peer, and flips DATA when
//! it does. A receiver accepts the slot only when the peer's DATA bit differs from its own ACK
//! bit, then flips ACK. One command is in flight per direction, so delivery is in order and at
//! most once per toggle.
//!
//! Frames are matched on their rolling index: a frame whose index equals the previous one is a
//! replay and its command slot is ignored.

use super::{ConfigFlags, Frame, Record};

#[derive(Debug, Clone, Default)]
pub struct Handshake {
    /// Config byte we transmit (DATA, ACK, AUDIO bits).
    out: ConfigFlags,
    /// Config byte last received from the peer.
    peer: ConfigFlags,
    tx_index: u8,
    rx_index: Option<u8>,
    wakeup: bool,
}

impl Handshake {
    pub const fn new() -> Self {
        Self {
            out: ConfigFlags::from_raw(0),
            peer: ConfigFlags::from_raw(0),
            tx_index: 0,
            rx_index: None,
            wakeup: false,
        }
    }

    /// Flag the next prepared frame as the first one after waking up.
    #[inline]
    pub fn request_wakeup(&mut self) {
        self.wakeup = true;
    }

    /// Process one received frame and return the command it delivers, if any.
    pub fn receive(&mut self, frame: &Frame) -> Option<Record> {
        self.peer = frame.flags();

        let index = frame.index();
        if self.rx_index == Some(index) {
            return None;
        }
        self.rx_index = Some(index);

        if self.peer.data() != self.out.ack() {
            self.out.toggle_ack();
            Some(frame.command())
        } else {
            None
        }
    }

    /// The peer acknowledged our last command; a new one may be loaded.
    #[inline]
    pub fn can_send(&self) -> bool {
        self.out.data() == self.peer.ack()
    }

    /// Stamp the next frame index and config byte into `frame`.
    ///
    /// `command` is loaded into the slot only if the previous one was acknowledged; otherwise it
    /// is handed back to the caller. The slot keeps its previous content when nothing new is
    /// loaded.
    pub fn prepare(
        &mut self,
        frame: &mut Frame,
        command: Option<Record>,
        audio: bool,
    ) -> Result<(), Record> {
        frame.set_index(self.tx_index);
        self.tx_index = self.tx_index.wrapping_add(1);

        let result = match command {
            Some(cmd) if self.can_send() => {
                self.out.toggle_data();
                frame.set_command(cmd);
                Ok(())
            }
            Some(cmd) => Err(cmd),
            None => Ok(()),
        };

        self.out.set_audio(audio);
        self.out.set_wakeup(core::mem::take(&mut self.wakeup));
        frame.set_flags(self.out);
        result
    }

    /// Flags received in the last frame.
    #[inline]
    pub fn peer_flags(&self) -> ConfigFlags {
        self.peer
    }

    #[inline]
    pub fn out_flags(&self) -> ConfigFlags {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replayed_frame_is_ignored() {
        let mut tx = Handshake::new();
        let mut rx = Handshake::new();
        let mut frame = Frame::new();

        tx.prepare(&mut frame, Some(Record::new(0x90, 1, 0, 0)), false)
            .unwrap();
        assert_eq!(rx.receive(&frame), Some(Record::new(0x90, 1, 0, 0)));
        assert_eq!(rx.receive(&frame), None);
    }

    #[test]
    fn wakeup_flag_is_sent_once() {
        let mut tx = Handshake::new();
        let mut frame = Frame::new();
        tx.request_wakeup();
        tx.prepare(&mut frame, None, false).unwrap();
        assert!(frame.flags().wakeup());
        tx.prepare(&mut frame, None, false).unwrap();
        assert!(!frame.flags().wakeup());
    }

    #[test]
    fn second_command_waits_for_ack() {
        let mut tx = Handshake::new();
        let mut frame = Frame::new();

        tx.prepare(&mut frame, Some(Record::new(0x90, 1, 0, 0)), false)
            .unwrap();
        assert!(!tx.can_send());
        let refused = tx.prepare(&mut frame, Some(Record::new(0x92, 1, 0, 0)), false);
        assert_eq!(refused, Err(Record::new(0x92, 1, 0, 0)));
        assert_eq!(frame.command(), Record::new(0x90, 1, 0, 0));
    }
}
