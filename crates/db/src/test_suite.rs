//! Behavior shared by every storage backend, exercised against each of them.

use alloy_primitives::{keccak256, Address, B256};
use plasma_primitives::{
    block::Block,
    coin::{CoinState, CoinStatus},
    transaction::Transaction,
};

use crate::{
    chain::ChainDb,
    errors::{Conflict, DbError},
};

fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

fn block(block_number: u64, txs: &[&Transaction]) -> Block {
    Block {
        block_number,
        root_hash: keccak256(block_number.to_be_bytes()),
        timestamp: block_number * 10,
        transactions: txs.iter().map(|tx| tx.hash).collect(),
    }
}

async fn deposit(db: &impl ChainDb, slot: u64, block_number: u64, owner: Address) -> Transaction {
    let tx = Transaction::deposit(slot, owner);
    db.insert_deposit(CoinState::deposited(slot, owner), &tx, &block(block_number, &[&tx]))
        .await
        .expect("must be able to insert deposit");

    tx
}

pub(crate) async fn deposits(db: &impl ChainDb) {
    let tx = deposit(db, 1, 1, alice()).await;

    let stored = db
        .get_transaction(tx.hash)
        .await
        .unwrap()
        .expect("deposit transaction must exist");
    assert_eq!(stored.mined_block, Some(1), "deposit must be mined in its block");
    assert_eq!(stored.mined_timestamp, Some(10));
    assert_eq!(
        db.get_coin_state(1).await.unwrap(),
        Some(CoinState::deposited(1, alice()))
    );
    assert_eq!(
        db.get_block(1).await.unwrap().map(|b| b.transactions),
        Some(vec![tx.hash])
    );

    // same block number
    let other = Transaction::deposit(2, bob());
    let err = db
        .insert_deposit(
            CoinState::deposited(2, bob()),
            &other,
            &block(1, &[&other]),
        )
        .await;
    assert!(
        matches!(err, Err(DbError::Conflict(Conflict::BlockExists(1)))),
        "duplicate block must conflict, got {err:?}"
    );
    assert!(
        db.get_coin_state(2).await.unwrap().is_none(),
        "a failed deposit must not leave a coin behind"
    );

    // same slot
    let again = Transaction::deposit(1, bob());
    let err = db
        .insert_deposit(CoinState::deposited(1, bob()), &again, &block(2, &[&again]))
        .await;
    assert!(
        matches!(err, Err(DbError::Conflict(Conflict::SlotExists(1)))),
        "double deposit must conflict, got {err:?}"
    );
    assert!(
        db.get_block(2).await.unwrap().is_none(),
        "a failed deposit must not leave a block behind"
    );
}

pub(crate) async fn block_commits(db: &impl ChainDb) {
    deposit(db, 1, 1, alice()).await;
    let transfer = Transaction::transfer(1, alice(), bob(), 1);
    db.insert_transaction(&transfer).await.unwrap();

    assert!(matches!(
        db.insert_transaction(&transfer).await,
        Err(DbError::Conflict(Conflict::TransactionExists(_)))
    ));

    let mined = block(1000, &[&transfer]);
    db.commit_block(&mined, std::slice::from_ref(&transfer))
        .await
        .expect("must be able to commit block");

    let stored = db.get_transaction(transfer.hash).await.unwrap().unwrap();
    assert_eq!(stored.mined_block, Some(1000));
    assert_eq!(stored.mined_timestamp, Some(10_000));
    assert_eq!(db.get_coin_state(1).await.unwrap().map(|c| c.owner), Some(bob()));
    assert_eq!(
        db.latest_block().await.unwrap().map(|b| b.block_number),
        Some(1000)
    );

    // racing round on the same number
    let err = db.commit_block(&block(1000, &[]), &[]).await;
    assert!(matches!(
        err,
        Err(DbError::Conflict(Conflict::BlockExists(1000)))
    ));

    // already mined
    let err = db
        .commit_block(&block(2000, &[&transfer]), std::slice::from_ref(&transfer))
        .await;
    assert!(matches!(
        err,
        Err(DbError::Conflict(Conflict::AlreadyMined(_)))
    ));
    assert!(db.get_block(2000).await.unwrap().is_none());
}

pub(crate) async fn history_queries(db: &impl ChainDb) {
    let deposit_tx = deposit(db, 7, 3, alice()).await;
    let first = Transaction::transfer(7, alice(), bob(), 3);
    let second = Transaction::transfer(7, bob(), alice(), 1000);

    db.insert_transaction(&first).await.unwrap();
    db.commit_block(&block(1000, &[&first]), std::slice::from_ref(&first))
        .await
        .unwrap();
    db.insert_transaction(&second).await.unwrap();
    db.commit_block(&block(2000, &[&second]), std::slice::from_ref(&second))
        .await
        .unwrap();

    assert!(db.has_transactions(7).await.unwrap());
    assert!(!db.has_transactions(8).await.unwrap());

    let last = db.last_mined_transaction(7).await.unwrap().unwrap();
    assert_eq!(last.hash, second.hash);

    let in_block = db.mined_transaction_in_block(7, 1000).await.unwrap().unwrap();
    assert_eq!(in_block.hash, first.hash);
    assert!(db.mined_transaction_in_block(7, 5000).await.unwrap().is_none());

    let spending = db.mined_transactions_spending(7, 3).await.unwrap();
    assert_eq!(
        spending.iter().map(|tx| tx.hash).collect::<Vec<_>>(),
        vec![first.hash]
    );

    let before = db
        .last_mined_transaction_spending_at_most(7, 999)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before.hash, first.hash);
    let before = db
        .last_mined_transaction_spending_at_most(7, 0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before.hash, deposit_tx.hash);

    // numeric, not lexicographic, ordering of block numbers
    let third = Transaction::transfer(7, alice(), bob(), 2000);
    db.insert_transaction(&third).await.unwrap();
    db.commit_block(&block(10_000, &[&third]), std::slice::from_ref(&third))
        .await
        .unwrap();
    assert_eq!(
        db.last_mined_transaction(7).await.unwrap().map(|tx| tx.hash),
        Some(third.hash)
    );
    assert_eq!(
        db.latest_block().await.unwrap().map(|b| b.block_number),
        Some(10_000)
    );

    let in_block = db.transactions_in_block(2000).await.unwrap();
    assert_eq!(in_block.len(), 1);
    assert_eq!(in_block[0].hash, second.hash);
    assert!(db.transactions_in_block(4000).await.unwrap().is_empty());
}

pub(crate) async fn pending_and_secrets(db: &impl ChainDb) {
    deposit(db, 1, 1, alice()).await;
    deposit(db, 2, 2, bob()).await;

    let secret = B256::repeat_byte(0x5e);
    let a = Transaction::swap(1, alice(), bob(), 1, 2, keccak256(secret)).unwrap();
    let b = Transaction::transfer(2, bob(), alice(), 2);
    let c = Transaction::transfer(1, alice(), alice(), 1);

    for tx in [&a, &b, &c] {
        db.insert_transaction(tx).await.unwrap();
    }

    let pending: Vec<B256> = db
        .pending_transactions()
        .await
        .unwrap()
        .into_iter()
        .map(|tx| tx.hash)
        .collect();
    assert_eq!(pending, vec![a.hash, b.hash, c.hash], "insertion order");

    db.delete_transaction(c.hash).await.unwrap();
    db.delete_transaction(c.hash).await.unwrap();
    assert_eq!(db.pending_transactions().await.unwrap().len(), 2);

    db.set_swap_secret(a.hash, secret).await.unwrap();
    let stored = db.get_transaction(a.hash).await.unwrap().unwrap();
    assert_eq!(stored.secret(), Some(secret));
    assert!(stored.swap.is_some_and(|terms| terms.hash_secret == keccak256(secret)));

    assert!(matches!(
        db.set_swap_secret(B256::ZERO, secret).await,
        Err(DbError::NotFound(_))
    ));

    db.commit_block(&block(1000, &[&a, &b]), &[a.clone(), b.clone()])
        .await
        .unwrap();
    assert_eq!(
        db.get_coin_state(1).await.unwrap().map(|c| c.state),
        Some(CoinStatus::Swapping),
        "a mined swap locks the coin"
    );
    assert_eq!(
        db.get_coin_state(2).await.unwrap().map(|c| c.state),
        Some(CoinStatus::Deposited)
    );
}

pub(crate) async fn swap_invalidation(db: &impl ChainDb) {
    let deposit_a = deposit(db, 1, 1, alice()).await;
    deposit(db, 2, 2, bob()).await;

    let a = Transaction::swap(1, alice(), bob(), 1, 2, keccak256([1u8])).unwrap();
    let b = Transaction::swap(2, bob(), alice(), 2, 1, keccak256([2u8])).unwrap();
    for tx in [&a, &b] {
        db.insert_transaction(tx).await.unwrap();
    }

    let err = db.invalidate_swaps(std::slice::from_ref(&a)).await;
    assert!(
        matches!(err, Err(DbError::NotFound(_))),
        "a pending swap cannot be invalidated, got {err:?}"
    );

    db.commit_block(&block(1000, &[&a, &b]), &[a.clone(), b.clone()])
        .await
        .unwrap();

    // a deposit is not a swap
    let err = db.invalidate_swaps(&[a.clone(), deposit_a.clone()]).await;
    assert!(matches!(err, Err(DbError::NotFound(_))));
    assert!(
        !db.get_transaction(a.hash).await.unwrap().unwrap().is_invalidated(),
        "a failed invalidation must not leave partial writes"
    );

    db.invalidate_swaps(&[a.clone(), b.clone()]).await.unwrap();

    assert!(db.get_transaction(a.hash).await.unwrap().unwrap().is_invalidated());
    assert_eq!(
        db.get_coin_state(1).await.unwrap(),
        Some(CoinState::deposited(1, alice())),
        "the coin goes back to its owner before the swap"
    );
    assert_eq!(
        db.get_coin_state(2).await.unwrap(),
        Some(CoinState::deposited(2, bob()))
    );

    // the history skips the swap, the block still lists it
    assert_eq!(
        db.last_mined_transaction(1).await.unwrap().map(|tx| tx.hash),
        Some(deposit_a.hash)
    );
    assert!(db.mined_transaction_in_block(1, 1000).await.unwrap().is_none());
    assert!(db.mined_transactions_spending(1, 1).await.unwrap().is_empty());
    assert_eq!(
        db.last_mined_transaction_spending_at_most(1, 5000)
            .await
            .unwrap()
            .map(|tx| tx.hash),
        Some(deposit_a.hash)
    );
    assert_eq!(db.transactions_in_block(1000).await.unwrap().len(), 2);
}

pub(crate) async fn coin_states(db: &impl ChainDb) {
    assert!(matches!(
        db.set_coin_status(9, CoinStatus::Exiting).await,
        Err(DbError::NotFound(_))
    ));

    db.put_coin_state(CoinState::deposited(9, alice()))
        .await
        .unwrap();
    db.set_coin_status(9, CoinStatus::Exiting).await.unwrap();
    assert_eq!(
        db.get_coin_state(9).await.unwrap().map(|c| c.state),
        Some(CoinStatus::Exiting)
    );

    db.put_coin_state(CoinState::deposited(9, bob()))
        .await
        .unwrap();
    assert_eq!(
        db.get_coin_state(9).await.unwrap(),
        Some(CoinState::deposited(9, bob()))
    );
}
