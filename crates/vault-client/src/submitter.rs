//! Transaction submission and confirmation.
//!
//! [`submit`] returns as soon as the transport accepts the transaction.
//! Waiting for it to land is a separate, explicit step:
//! [`confirm_transaction`].

use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use svm_tx::{Address, Blockhash, Instruction, Message, Signature, Signer, VersionedTransaction};

use crate::commands::{build_instruction, VaultCommand};
use crate::config::Commitment;
use crate::error::{TransportError, VaultError};

/// Network status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Processed,
    Confirmed,
    Finalized,
    /// Landed but the program returned an error.
    Failed(String),
}

/// The request/response capability this crate needs from an RPC client.
///
/// Retries, rate limiting and request timeouts belong to the implementation;
/// whatever it returns is handed back to the caller as-is.
pub trait RpcTransport {
    /// A recent blockhash to pin a new transaction to.
    fn latest_blockhash(&self) -> Result<Blockhash, TransportError>;

    /// Submit wire-format transaction bytes; returns the tracking signature.
    fn send_transaction(&self, wire_tx: &[u8]) -> Result<Signature, TransportError>;

    /// Raw account data at `address`, or `None` if no account exists there.
    fn account_data(&self, address: &Address) -> Result<Option<Vec<u8>>, TransportError>;

    /// Current status of `signature`, or `None` if the network has not seen it.
    fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionStatus>, TransportError>;
}

/// Sign `instructions` as one atomic transaction and send it.
///
/// `signers` must include the payer. Does not wait for confirmation.
pub fn submit<T: RpcTransport + ?Sized>(
    transport: &T,
    instructions: &[Instruction],
    payer: &Address,
    signers: &[&dyn Signer],
) -> Result<Signature, VaultError> {
    let recent_blockhash = transport.latest_blockhash()?;

    let message = Message::compile(instructions, payer, recent_blockhash)?;
    let transaction = VersionedTransaction::try_new(message, signers)?;
    let wire = transaction.to_wire()?;

    let signature = transport.send_transaction(&wire)?;
    info!(
        "submitted {signature}: {} instruction(s), {} bytes, blockhash {recent_blockhash}",
        instructions.len(),
        wire.len()
    );
    Ok(signature)
}

/// Build `command` for `vault_id` and submit it with `authority` as payer
/// and sole signer.
pub fn submit_command<T: RpcTransport + ?Sized>(
    transport: &T,
    program_id: &Address,
    vault_id: u64,
    command: &VaultCommand,
    authority: &dyn Signer,
) -> Result<Signature, VaultError> {
    let authority_address = authority.address();
    let instruction = build_instruction(program_id, vault_id, command, &authority_address)?;
    submit(transport, &[instruction], &authority_address, &[authority])
}

/// Polling settings for [`confirm_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub commitment: Commitment,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Block until `signature` reaches `options.commitment`.
///
/// Fails with [`VaultError::TransactionFailed`] if the transaction landed
/// with an error, [`VaultError::ConfirmationTimeout`] once `options.timeout`
/// elapses, and with the transport's own error if a status query fails.
/// A timeout too large to represent as an instant never expires.
pub fn confirm_transaction<T: RpcTransport + ?Sized>(
    transport: &T,
    signature: &Signature,
    options: &ConfirmOptions,
) -> Result<TransactionStatus, VaultError> {
    let deadline = Instant::now().checked_add(options.timeout);

    loop {
        match transport.signature_status(signature)? {
            Some(TransactionStatus::Failed(reason)) => {
                warn!("transaction {signature} failed: {reason}");
                return Err(VaultError::TransactionFailed {
                    signature: *signature,
                    reason,
                });
            }
            Some(status) if reaches(&status, options.commitment) => {
                info!("transaction {signature} reached {status:?}");
                return Ok(status);
            }
            _ => {}
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    warn!(
                        "transaction {signature} not {:?} after {:?}",
                        options.commitment, options.timeout
                    );
                    return Err(VaultError::ConfirmationTimeout {
                        signature: *signature,
                    });
                }
                options.poll_interval.min(deadline - now)
            }
            None => options.poll_interval,
        };
        thread::sleep(pause);
    }
}

fn reaches(status: &TransactionStatus, wanted: Commitment) -> bool {
    let level = match status {
        TransactionStatus::Processed => Commitment::Processed,
        TransactionStatus::Confirmed => Commitment::Confirmed,
        TransactionStatus::Finalized => Commitment::Finalized,
        TransactionStatus::Failed(_) => return false,
    };
    level >= wanted
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use svm_tx::Keypair;

    use super::*;
    use crate::commands::SET_DEPOSIT_SUB_ACCOUNT_DISCRIMINATOR;
    use crate::config::BORING_VAULT_PROGRAM_ID;

    /// Records what it is sent and replays scripted answers.
    #[derive(Default)]
    struct ScriptedTransport {
        blockhash_error: Option<TransportError>,
        send_error: Option<TransportError>,
        sent: RefCell<Vec<Vec<u8>>>,
        statuses: RefCell<VecDeque<Result<Option<TransactionStatus>, TransportError>>>,
        status_calls: Cell<usize>,
    }

    impl RpcTransport for ScriptedTransport {
        fn latest_blockhash(&self) -> Result<Blockhash, TransportError> {
            match &self.blockhash_error {
                Some(e) => Err(e.clone()),
                None => Ok(Blockhash::new_from_array([0xBB; 32])),
            }
        }

        fn send_transaction(&self, wire_tx: &[u8]) -> Result<Signature, TransportError> {
            if let Some(e) = &self.send_error {
                return Err(e.clone());
            }
            self.sent.borrow_mut().push(wire_tx.to_vec());
            let tx = VersionedTransaction::from_wire(wire_tx)
                .map_err(|e| TransportError::Rejected(e.to_string()))?;
            Ok(tx.signatures[0])
        }

        fn account_data(&self, _address: &Address) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(None)
        }

        fn signature_status(
            &self,
            _signature: &Signature,
        ) -> Result<Option<TransactionStatus>, TransportError> {
            self.status_calls.set(self.status_calls.get() + 1);
            self.statuses.borrow_mut().pop_front().unwrap_or(Ok(None))
        }
    }

    fn fast_options(commitment: Commitment) -> ConfirmOptions {
        ConfirmOptions {
            commitment,
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(1),
        }
    }

    // -- submit ---------------------------------------------------------------

    #[test]
    fn submit_sends_signed_v0_transaction() {
        let transport = ScriptedTransport::default();
        let authority = Keypair::from_seed(&[0x42; 32]);

        let signature = submit_command(
            &transport,
            &BORING_VAULT_PROGRAM_ID,
            1,
            &VaultCommand::SetDepositSubAccount { new_sub_account: 5 },
            &authority,
        )
        .unwrap();

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        let tx = VersionedTransaction::from_wire(&sent[0]).unwrap();
        assert!(tx.verify().is_ok());
        assert_eq!(tx.signature(), Some(&signature));
        assert_eq!(tx.message.payer(), Some(&authority.address()));
        assert_eq!(
            tx.message.recent_blockhash,
            Blockhash::new_from_array([0xBB; 32])
        );
        assert_eq!(
            &tx.message.instructions[0].data[..8],
            &SET_DEPOSIT_SUB_ACCOUNT_DISCRIMINATOR
        );
    }

    #[test]
    fn submit_with_separate_payer_signs_twice() {
        let transport = ScriptedTransport::default();
        let payer = Keypair::from_seed(&[0x01; 32]);
        let authority = Keypair::from_seed(&[0x02; 32]);
        let ix = build_instruction(
            &BORING_VAULT_PROGRAM_ID,
            1,
            &VaultCommand::Pause,
            &authority.address(),
        )
        .unwrap();

        submit(&transport, &[ix], &payer.address(), &[&payer, &authority]).unwrap();

        let tx = VersionedTransaction::from_wire(&transport.sent.borrow()[0]).unwrap();
        assert_eq!(tx.signatures.len(), 2);
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn blockhash_failure_is_surfaced_unchanged() {
        let transport = ScriptedTransport {
            blockhash_error: Some(TransportError::Unavailable("connection refused".into())),
            ..Default::default()
        };
        let authority = Keypair::from_seed(&[0x42; 32]);

        let err = submit_command(
            &transport,
            &BORING_VAULT_PROGRAM_ID,
            1,
            &VaultCommand::Unpause,
            &authority,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            VaultError::Transport(TransportError::Unavailable(ref reason)) if reason == "connection refused"
        ));
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn missing_payer_signer_fails_before_sending() {
        let transport = ScriptedTransport::default();
        let payer = Keypair::from_seed(&[0x01; 32]);
        let authority = Keypair::from_seed(&[0x02; 32]);
        let ix = build_instruction(
            &BORING_VAULT_PROGRAM_ID,
            1,
            &VaultCommand::Pause,
            &authority.address(),
        )
        .unwrap();

        let err = submit(&transport, &[ix], &payer.address(), &[&authority]).unwrap_err();
        assert!(matches!(err, VaultError::Signing(_)));
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn rejection_reason_is_preserved() {
        let transport = ScriptedTransport {
            send_error: Some(TransportError::Rejected("Blockhash not found".into())),
            ..Default::default()
        };
        let authority = Keypair::from_seed(&[0x42; 32]);

        let err = submit_command(
            &transport,
            &BORING_VAULT_PROGRAM_ID,
            1,
            &VaultCommand::Pause,
            &authority,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "transaction rejected: Blockhash not found");
    }

    #[test]
    fn submit_does_not_poll_status() {
        let transport = ScriptedTransport::default();
        let authority = Keypair::from_seed(&[0x42; 32]);
        submit_command(
            &transport,
            &BORING_VAULT_PROGRAM_ID,
            1,
            &VaultCommand::Pause,
            &authority,
        )
        .unwrap();
        assert_eq!(transport.status_calls.get(), 0);
    }

    // -- confirm --------------------------------------------------------------

    #[test]
    fn confirm_waits_for_commitment() {
        let transport = ScriptedTransport::default();
        transport.statuses.borrow_mut().extend([
            Ok(None),
            Ok(Some(TransactionStatus::Processed)),
            Ok(Some(TransactionStatus::Confirmed)),
        ]);

        let status = confirm_transaction(
            &transport,
            &Signature::default(),
            &fast_options(Commitment::Confirmed),
        )
        .unwrap();

        assert_eq!(status, TransactionStatus::Confirmed);
        assert_eq!(transport.status_calls.get(), 3);
    }

    #[test]
    fn finalized_satisfies_lower_commitment() {
        let transport = ScriptedTransport::default();
        transport
            .statuses
            .borrow_mut()
            .push_back(Ok(Some(TransactionStatus::Finalized)));

        let status = confirm_transaction(
            &transport,
            &Signature::default(),
            &fast_options(Commitment::Processed),
        )
        .unwrap();
        assert_eq!(status, TransactionStatus::Finalized);
    }

    #[test]
    fn failed_transaction_is_reported() {
        let transport = ScriptedTransport::default();
        transport
            .statuses
            .borrow_mut()
            .push_back(Ok(Some(TransactionStatus::Failed("NotAuthorized".into()))));

        let err = confirm_transaction(
            &transport,
            &Signature::default(),
            &fast_options(Commitment::Confirmed),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VaultError::TransactionFailed { ref reason, .. } if reason == "NotAuthorized"
        ));
    }

    #[test]
    fn confirm_times_out() {
        let transport = ScriptedTransport::default();
        let err = confirm_transaction(
            &transport,
            &Signature::default(),
            &fast_options(Commitment::Finalized),
        )
        .unwrap_err();
        assert!(matches!(err, VaultError::ConfirmationTimeout { .. }));
        assert!(transport.status_calls.get() > 1);
    }

    #[test]
    fn unrepresentable_timeout_does_not_overflow() {
        let transport = ScriptedTransport::default();
        transport.statuses.borrow_mut().extend([
            Ok(None),
            Ok(Some(TransactionStatus::Confirmed)),
        ]);
        let options = ConfirmOptions {
            timeout: Duration::MAX,
            ..fast_options(Commitment::Confirmed)
        };

        let status = confirm_transaction(&transport, &Signature::default(), &options).unwrap();
        assert_eq!(status, TransactionStatus::Confirmed);
    }

    #[test]
    fn max_configured_timeout_confirms() {
        let transport = ScriptedTransport::default();
        transport
            .statuses
            .borrow_mut()
            .push_back(Ok(Some(TransactionStatus::Confirmed)));
        let config = crate::config::ClientConfig::from_json(
            r#"{"confirm_timeout_secs": 18446744073709551615}"#,
        )
        .unwrap();

        let status =
            confirm_transaction(&transport, &Signature::default(), &config.confirm_options())
                .unwrap();
        assert_eq!(status, TransactionStatus::Confirmed);
    }

    #[test]
    fn status_query_error_is_not_retried() {
        let transport = ScriptedTransport::default();
        transport
            .statuses
            .borrow_mut()
            .push_back(Err(TransportError::Timeout));

        let err = confirm_transaction(
            &transport,
            &Signature::default(),
            &fast_options(Commitment::Confirmed),
        )
        .unwrap_err();
        assert!(matches!(err, VaultError::Transport(TransportError::Timeout)));
        assert_eq!(transport.status_calls.get(), 1);
    }
}
