use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capability::{
    BatchReader, EventSource, NotificationKind, Notifier, ReceiptWaiter, TransferWriter, WalletState,
};
use crate::config::Config;
use crate::error::{AddressError, Error, ReadError, SubmitError, ValidationError};
use crate::history::{TransactionHistory, TransactionLogEntry};
use crate::reader::TokenInfoReader;
use crate::transfer::{TransferOrchestrator, TransferRequest, TransferState};
use crate::types::address::{Address, TxHash};
use crate::types::log::Receipt;
use crate::types::token::{Balance, TokenInfo, TokenMetadata};
use crate::watcher::EventWatcher;

/// Everything a session needs from its host.
pub struct Capabilities {
    pub batch: Arc<dyn BatchReader>,
    pub writer: Arc<dyn TransferWriter>,
    pub receipts: Arc<dyn ReceiptWaiter>,
    pub events: Arc<dyn EventSource>,
    pub notifier: Arc<dyn Notifier>,
    pub wallet: watch::Receiver<WalletState>,
}

/// Identifies one metadata or balance read, so its result can be dropped
/// if the session moved on before it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket {
    pub address: Address,
    pub owner: Option<Address>,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Applied,
    Stale,
}

/// What is known about the currently submitted contract.
#[derive(Debug, Clone)]
pub struct ContractView {
    pub address: Address,
    pub metadata: Option<TokenMetadata>,
    pub balance: Option<Balance>,
    /// Last read failure, cleared by the next successful read.
    pub read_error: Option<ReadError>,
    /// Set when `metadata` comes from an earlier read and the latest one
    /// failed.
    pub stale: bool,
}

impl ContractView {
    fn new(address: Address) -> Self {
        Self {
            address,
            metadata: None,
            balance: None,
            read_error: None,
            stale: false,
        }
    }
}

/// One user's interaction with one token contract at a time.
///
/// Metadata, balance and history all belong to the submitted address and
/// are discarded together when it changes.
pub struct Session {
    reader: TokenInfoReader,
    watcher: EventWatcher,
    transfers: TransferOrchestrator,
    notifier: Arc<dyn Notifier>,
    wallet_rx: watch::Receiver<WalletState>,
    wallet: WalletState,
    contract: Option<ContractView>,
    address_error: Option<AddressError>,
    history: TransactionHistory,
    generation: u64,
}

impl Session {
    pub fn new(config: Config, caps: Capabilities) -> Self {
        let Capabilities {
            batch,
            writer,
            receipts,
            events,
            notifier,
            mut wallet,
        } = caps;
        let wallet_state = *wallet.borrow_and_update();

        Self {
            reader: TokenInfoReader::new(batch),
            watcher: EventWatcher::with_fallback_decimals(events, config.fallback_decimals),
            transfers: TransferOrchestrator::new(writer, receipts, Arc::clone(&notifier))
                .with_confirmation_timeout(config.confirmation_timeout()),
            notifier,
            wallet_rx: wallet,
            wallet: wallet_state,
            contract: None,
            address_error: None,
            history: TransactionHistory::with_capacity(config.history_capacity),
            generation: 0,
        }
    }

    pub fn contract(&self) -> Option<&ContractView> {
        self.contract.as_ref()
    }

    pub fn metadata(&self) -> Option<&TokenMetadata> {
        self.contract.as_ref()?.metadata.as_ref()
    }

    pub fn balance(&self) -> Option<&Balance> {
        self.contract.as_ref()?.balance.as_ref()
    }

    pub fn decimals(&self) -> Option<u8> {
        self.metadata().map(|m| m.decimals)
    }

    pub fn address_error(&self) -> Option<&AddressError> {
        self.address_error.as_ref()
    }

    pub fn history(&self) -> &TransactionHistory {
        &self.history
    }

    pub fn wallet(&self) -> WalletState {
        self.wallet
    }

    pub fn transfers(&self) -> &TransferOrchestrator {
        &self.transfers
    }

    /// Mutable access for editing the transfer form.
    pub fn transfers_mut(&mut self) -> &mut TransferOrchestrator {
        &mut self.transfers
    }

    pub fn transfer_state(&self) -> &TransferState {
        self.transfers.state()
    }

    /// A handle for running reads outside the session; feed the results
    /// back through [`complete_lookup`](Self::complete_lookup).
    pub fn reader(&self) -> TokenInfoReader {
        self.reader.clone()
    }

    /// Make `input` the watched contract.
    ///
    /// Drops everything known about the previous address, subscribes to
    /// its `Transfer` events and returns a ticket for the metadata read.
    pub async fn submit_address(&mut self, input: &str) -> Result<LookupTicket, Error> {
        let address = match Address::parse(input) {
            Ok(address) => address,
            Err(e) => {
                self.address_error = Some(e.clone());
                self.notifier
                    .notify(NotificationKind::Error, "Please fix the validation errors");
                return Err(ValidationError::ContractAddress(e).into());
            }
        };
        self.address_error = None;

        self.watcher.unsubscribe();
        self.history.clear();
        self.generation += 1;
        self.contract = Some(ContractView::new(address));
        info!(%address, generation = self.generation, "contract address submitted");
        self.notifier
            .notify(NotificationKind::Pending, "Fetching token information...");

        if let Err(e) = self.watcher.subscribe(address, self.wallet.account).await {
            warn!(%address, error = %e, "could not watch Transfer events");
            self.notifier.notify(NotificationKind::Error, &e.to_string());
        }

        Ok(LookupTicket {
            address,
            owner: None,
            generation: self.generation,
        })
    }

    /// Prepare a balance refresh for the connected account. The refresh
    /// re-reads the metadata as well.
    pub fn begin_balance_refresh(&mut self) -> Result<LookupTicket, Error> {
        let Some(view) = self.contract.as_ref() else {
            self.notifier.notify(
                NotificationKind::Error,
                "Please first fetch token info by entering the contract address.",
            );
            return Err(ValidationError::NoContract.into());
        };
        let Some(owner) = self.wallet.account else {
            self.notifier
                .notify(NotificationKind::Error, "Please connect your wallet first.");
            return Err(ValidationError::WalletNotConnected.into());
        };

        let ticket = LookupTicket {
            address: view.address,
            owner: Some(owner),
            generation: self.generation,
        };
        self.notifier
            .notify(NotificationKind::Pending, "Fetching your balance...");
        Ok(ticket)
    }

    /// Apply a read result if `ticket` still describes the session.
    pub fn complete_lookup(
        &mut self,
        ticket: LookupTicket,
        result: Result<TokenInfo, ReadError>,
    ) -> LookupOutcome {
        if !self.is_current(&ticket) {
            warn!(address = %ticket.address, "discarding stale token read");
            return LookupOutcome::Stale;
        }
        let Some(view) = self.contract.as_mut() else {
            return LookupOutcome::Stale;
        };

        match result {
            Ok(info) => {
                debug!(address = %view.address, symbol = %info.metadata.symbol, "token read applied");
                view.metadata = Some(info.metadata);
                if ticket.owner.is_some() {
                    view.balance = info.balance;
                }
                view.read_error = None;
                view.stale = false;
                let message = if ticket.owner.is_some() {
                    "Balance retrieved successfully!"
                } else {
                    "Token information retrieved successfully!"
                };
                self.notifier.notify(NotificationKind::Success, message);
            }
            Err(e) => {
                warn!(address = %view.address, error = %e, "token read failed");
                view.stale = view.metadata.is_some();
                if ticket.owner.is_some() {
                    view.balance = None;
                }
                self.notifier.notify(NotificationKind::Error, &e.to_string());
                view.read_error = Some(e);
            }
        }
        LookupOutcome::Applied
    }

    /// Submit `input` and read its metadata.
    pub async fn lookup(&mut self, input: &str) -> Result<LookupOutcome, Error> {
        let ticket = self.submit_address(input).await?;
        self.run_read(ticket).await
    }

    /// Re-read metadata plus the connected account's balance.
    pub async fn refresh_balance(&mut self) -> Result<LookupOutcome, Error> {
        let ticket = self.begin_balance_refresh()?;
        self.run_read(ticket).await
    }

    async fn run_read(&mut self, ticket: LookupTicket) -> Result<LookupOutcome, Error> {
        let result = self.reader.fetch(ticket.address, ticket.owner).await;
        let failure = result.as_ref().err().cloned();
        let outcome = self.complete_lookup(ticket, result);
        match failure {
            Some(e) if outcome == LookupOutcome::Applied => Err(e.into()),
            _ => Ok(outcome),
        }
    }

    fn is_current(&self, ticket: &LookupTicket) -> bool {
        let Some(view) = self.contract.as_ref() else {
            return false;
        };
        ticket.generation == self.generation
            && ticket.address == view.address
            && (ticket.owner.is_none() || ticket.owner == self.wallet.account)
    }

    /// Submit a transfer on the watched contract.
    pub async fn submit_transfer(&mut self, request: TransferRequest) -> Result<TxHash, Error> {
        let Some(token) = self.contract.as_ref().map(|c| c.address) else {
            self.notifier.notify(
                NotificationKind::Error,
                "Please first fetch token info by entering the contract address.",
            );
            return Err(SubmitError::Invalid(ValidationError::NoContract).into());
        };
        let decimals = self.decimals();
        Ok(self.transfers.submit(token, request, decimals).await?)
    }

    /// Wait for the in-flight transfer to be mined.
    pub async fn await_confirmation(&mut self) -> Result<Receipt, Error> {
        Ok(self.transfers.await_confirmation().await?)
    }

    /// Wait for the next `Transfer` event and record it in history.
    ///
    /// Returns `None` once there is no live subscription.
    pub async fn next_event(&mut self) -> Option<&TransactionLogEntry> {
        let decimals = self.decimals();
        let entry = self.watcher.next_entry(decimals).await?;
        self.history.push(entry);
        self.history.latest()
    }

    /// Record every event already delivered, without waiting. Returns how
    /// many were added.
    pub fn drain_events(&mut self) -> usize {
        let decimals = self.decimals();
        let mut added = 0;
        while let Some(entry) = self.watcher.try_next_entry(decimals) {
            self.history.push(entry);
            added += 1;
        }
        added
    }

    /// Pick up account or network changes published by the wallet.
    /// Returns whether anything changed.
    pub async fn sync_wallet(&mut self) -> Result<bool, Error> {
        if !self.wallet_rx.has_changed().unwrap_or(false) {
            return Ok(false);
        }
        let next = *self.wallet_rx.borrow_and_update();
        let previous = std::mem::replace(&mut self.wallet, next);
        if previous == next {
            return Ok(false);
        }

        if previous.chain_id.is_some() && previous.chain_id != next.chain_id {
            info!(from = ?previous.chain_id, to = ?next.chain_id, "network changed");
            if self.contract.is_some() {
                self.reset_contract();
                self.notifier.notify(
                    NotificationKind::Error,
                    "Network changed; look up the contract again.",
                );
            }
            return Ok(true);
        }

        if previous.account != next.account {
            info!(account = ?next.account, "account changed");
            if let Some(view) = self.contract.as_mut() {
                view.balance = None;
                let address = view.address;
                // Keep the live stream so undrained logs survive the switch.
                if !self.watcher.set_self_address(next.account) {
                    if let Err(e) = self.watcher.subscribe(address, next.account).await {
                        warn!(%address, error = %e, "could not watch Transfer events");
                        self.notifier.notify(NotificationKind::Error, &e.to_string());
                        return Err(e.into());
                    }
                }
            }
        }
        Ok(true)
    }

    /// Forget the contract, its history and the transfer form.
    pub fn clear(&mut self) {
        debug!("clearing session");
        self.reset_contract();
        self.transfers.reset();
        self.address_error = None;
    }

    /// Tear down the event subscription.
    pub fn close(mut self) {
        self.watcher.unsubscribe();
    }

    fn reset_contract(&mut self) {
        self.watcher.unsubscribe();
        self.contract = None;
        self.history.clear();
        self.generation += 1;
    }
}
