//! Serialized access to the shared [`buscore::mailbox::Mailbox`] (spec
//! section 4.6, "Mailbox access is serialised with a process-local
//! mutex"). Opcode issuance is the sole synchronization point with the
//! coprocessor: the adapter waits for the opcode word to read back as
//! `None` before issuing the next request.

use std::time::Duration;

use buscore::mailbox::{Mailbox, Opcode};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// How long to sleep between polls while waiting for the opcode to clear.
/// Not part of the protocol, just a host-side scheduling knob.
const POLL_INTERVAL: Duration = Duration::from_micros(50);

pub struct MailboxHandle {
    mailbox: Mutex<Mailbox>,
}

impl MailboxHandle {
    pub fn new(mailbox: Mailbox) -> Self {
        Self { mailbox: Mutex::new(mailbox) }
    }

    /// Run `configure` with exclusive access to the mailbox to fill in
    /// argument sub-records, then post `opcode` as the publish step, and
    /// wait for the coprocessor to clear it back to `None`.
    pub async fn issue<F, R>(&self, opcode: Opcode, configure: F) -> R
    where
        F: FnOnce(&mut Mailbox) -> R,
    {
        let result = {
            // Hold the lock across "wait for previous request to clear" and
            // "write new arguments" so no other caller's request can be
            // interleaved between the two.
            let mut mailbox = self.mailbox.lock().await;
            while !mailbox.is_idle() {
                drop(mailbox);
                sleep(POLL_INTERVAL).await;
                mailbox = self.mailbox.lock().await;
            }
            let r = configure(&mut mailbox);
            mailbox.post(opcode);
            r
        };

        self.wait_idle().await;
        result
    }

    /// Block until the opcode word reads back as `None`, i.e. the
    /// coprocessor has finished the outstanding request.
    pub async fn wait_idle(&self) {
        loop {
            {
                let mailbox = self.mailbox.lock().await;
                if mailbox.is_idle() {
                    return;
                }
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn with_lock<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Mailbox) -> R,
    {
        let mut mailbox = self.mailbox.lock().await;
        f(&mut mailbox)
    }
}
