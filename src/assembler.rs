//! Transaction assembly state machine.
//!
//! `Empty -> InstructionsStaged -> Messaged -> Signed -> Dispatched`.
//! Instruction order is load-bearing: a platform-fee transfer must precede
//! mint creation, which must precede associated-account creation, which must
//! precede the buy, because later instructions assume account state produced
//! by earlier ones inside the same atomic unit. Atomicity itself is the
//! ledger's job; this component's sole obligation is a byte-correct, fully
//! signed message.

use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;

use crate::error::AssemblerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Empty,
    InstructionsStaged,
    Messaged,
    Signed,
    Dispatched,
}

impl AssemblerState {
    fn name(self) -> &'static str {
        match self {
            AssemblerState::Empty => "Empty",
            AssemblerState::InstructionsStaged => "InstructionsStaged",
            AssemblerState::Messaged => "Messaged",
            AssemblerState::Signed => "Signed",
            AssemblerState::Dispatched => "Dispatched",
        }
    }
}

#[derive(Debug)]
pub struct TransactionAssembler {
    state: AssemblerState,
    instructions: Vec<Instruction>,
    message: Option<Message>,
    transaction: Option<Transaction>,
}

impl Default for TransactionAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionAssembler {
    pub fn new() -> Self {
        Self {
            state: AssemblerState::Empty,
            instructions: Vec::new(),
            message: None,
            transaction: None,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    fn invalid(&self, op: &'static str) -> AssemblerError {
        AssemblerError::InvalidState {
            op,
            state: self.state.name(),
        }
    }

    /// Append an instruction. Valid only before `finalize`.
    pub fn add_instruction(&mut self, ix: Instruction) -> Result<&mut Self, AssemblerError> {
        match self.state {
            AssemblerState::Empty | AssemblerState::InstructionsStaged => {
                self.instructions.push(ix);
                self.state = AssemblerState::InstructionsStaged;
                Ok(self)
            }
            _ => Err(self.invalid("add_instruction")),
        }
    }

    /// Freeze the instruction list into a message. No instruction may be
    /// added afterward.
    pub fn finalize(
        &mut self,
        fee_payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> Result<(), AssemblerError> {
        if self.state != AssemblerState::InstructionsStaged {
            return Err(self.invalid("finalize"));
        }
        let message =
            Message::new_with_blockhash(&self.instructions, Some(fee_payer), &recent_blockhash);
        self.message = Some(message);
        self.state = AssemblerState::Messaged;
        Ok(())
    }

    /// Every account flagged as a signer anywhere in the message.
    pub fn required_signers(&self) -> Vec<Pubkey> {
        match &self.message {
            Some(message) => {
                let n = message.header.num_required_signatures as usize;
                message.account_keys[..n].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Sign the frozen message. Signer order does not matter, but every
    /// required signer must be present or the call fails before anything is
    /// serialized.
    pub fn sign(&mut self, signers: &[&Keypair]) -> Result<(), AssemblerError> {
        if self.state != AssemblerState::Messaged {
            return Err(self.invalid("sign"));
        }
        let message = self.message.as_ref().expect("message set in Messaged state");

        let n = message.header.num_required_signatures as usize;
        let mut ordered: Vec<&Keypair> = Vec::with_capacity(n);
        for required in &message.account_keys[..n] {
            match signers.iter().find(|kp| kp.pubkey() == *required) {
                Some(kp) => ordered.push(kp),
                None => return Err(AssemblerError::MissingSignature(*required)),
            }
        }

        let recent_blockhash = message.recent_blockhash;
        let mut tx = Transaction::new_unsigned(message.clone());
        tx.try_sign(&ordered, recent_blockhash)
            .map_err(|e| AssemblerError::Signing(e.to_string()))?;

        self.transaction = Some(tx);
        self.state = AssemblerState::Signed;
        Ok(())
    }

    /// Borrow the fully signed transaction for dispatch.
    pub fn signed_transaction(&self) -> Result<&Transaction, AssemblerError> {
        match self.state {
            AssemblerState::Signed => Ok(self
                .transaction
                .as_ref()
                .expect("transaction set in Signed state")),
            _ => Err(self.invalid("signed_transaction")),
        }
    }

    /// Record that the signed bytes were handed to the ledger boundary.
    pub fn mark_dispatched(&mut self) -> Result<(), AssemblerError> {
        if self.state != AssemblerState::Signed {
            return Err(self.invalid("mark_dispatched"));
        }
        self.state = AssemblerState::Dispatched;
        Ok(())
    }
}
