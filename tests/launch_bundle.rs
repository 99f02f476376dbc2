//! End-to-end assembly of the atomic launch bundle, checked against a
//! reference encoding built directly with the SDK.

use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;

use soulmint::assembler::TransactionAssembler;
use soulmint::pump::constants::{PLATFORM_FEE_LAMPORTS, PLATFORM_TREASURY};
use soulmint::pump::{curve, instructions, TrackVolume};

#[test]
fn launch_bundle_serializes_byte_identical_to_reference() {
    let wallet = Keypair::new();
    let mint_keypair = Keypair::new();
    let user = wallet.pubkey();
    let mint = mint_keypair.pubkey();
    let blockhash = Hash::new_unique();

    let buy_lamports = 500_000_000u64;
    let expected_tokens = curve::quote_initial_buy(buy_lamports);
    let min_tokens = curve::apply_slippage_down(expected_tokens, 100);
    let max_cost = curve::apply_slippage_up(buy_lamports, 100);

    let instructions = vec![
        instructions::build_platform_fee(&user),
        instructions::build_create(&user, &mint, "Launch", "LNCH", "https://meta.example/l.json")
            .unwrap(),
        instructions::build_create_associated_account(&user, &user, &mint),
        instructions::build_buy(&user, &mint, &user, min_tokens, max_cost, TrackVolume::Absent)
            .unwrap(),
    ];

    // Fee transfer precedes create, which precedes the associated-account
    // creation, which precedes the buy.
    let mut assembler = TransactionAssembler::new();
    for ix in instructions.clone() {
        assembler.add_instruction(ix).unwrap();
    }
    assembler.finalize(&user, blockhash).unwrap();
    assembler.sign(&[&mint_keypair, &wallet]).unwrap();

    let reference = Transaction::new(
        &[&wallet, &mint_keypair],
        Message::new_with_blockhash(&instructions, Some(&user), &blockhash),
        blockhash,
    );

    let assembled = assembler.signed_transaction().unwrap();
    assert_eq!(assembled.message_data(), reference.message_data());
    assert_eq!(assembled.signatures, reference.signatures);
    assert!(assembled.is_signed());
}

#[test]
fn launch_bundle_without_mint_signer_is_refused() {
    let wallet = Keypair::new();
    let mint_keypair = Keypair::new();
    let user = wallet.pubkey();
    let mint = mint_keypair.pubkey();

    let mut assembler = TransactionAssembler::new();
    assembler
        .add_instruction(instructions::build_platform_fee(&user))
        .unwrap();
    assembler
        .add_instruction(
            instructions::build_create(&user, &mint, "Launch", "LNCH", "https://meta.example")
                .unwrap(),
        )
        .unwrap();
    assembler.finalize(&user, Hash::new_unique()).unwrap();

    assert!(assembler.sign(&[&wallet]).is_err());
}

#[test]
fn platform_fee_goes_to_the_treasury_first() {
    let user = Keypair::new().pubkey();
    let ix = instructions::build_platform_fee(&user);
    assert_eq!(ix.accounts[0].pubkey, user);
    assert_eq!(ix.accounts[1].pubkey, PLATFORM_TREASURY);
    assert_eq!(
        u64::from_le_bytes(ix.data[4..12].try_into().unwrap()),
        PLATFORM_FEE_LAMPORTS
    );
}
