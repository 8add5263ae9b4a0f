//! Invex reconciliation and incremental update engine.
//!
//! The engine keeps one rule true on the network: an account holds a
//! `$a:` ban on exactly one pooled channel iff it is a contact on at
//! least one directory project. It gets there in two ways:
//!
//! - **bootstrap**: a one-shot reconciliation run once the live ban lists
//!   are fully known, diffing directory membership against live bans and
//!   emitting the minimal set of mode changes;
//! - **incremental**: per-notification handlers that apply the same
//!   invariants one change at a time.
//!
//! There is no parallelism here. One logical thread of control owns the
//! engine and runs each operation to completion; the only suspension
//! points are transport awaits.

use std::collections::{HashMap, HashSet};

use garnet_pool::SlotPool;
use garnet_proto::{
    account_mask, casefold, mask_account, parse_listing, Line, Notification, DIRECTORY_END,
    DIRECTORY_ENTRY,
};
use garnet_store::MembershipStore;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::io::{CommandSink, MessageWaiter};

/// The directory service of record for project membership.
const DIRECTORY_SERVICE: &str = "ProjectServ";

/// Observed ban list of one pooled channel at bootstrap.
#[derive(Debug, Clone)]
pub struct ChannelBans {
    /// Casefolded channel name.
    pub channel: String,
    /// Every ban mask present, account bans and foreign bans alike.
    pub masks: Vec<String>,
}

/// Counters from one bootstrap run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Stale account bans removed.
    pub removed: usize,
    /// Missing account bans added.
    pub added: usize,
    /// Group contacts left without a grant because the pool filled up.
    pub unassigned: usize,
}

/// The slice of configuration the core interprets.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Casefolded pooled channel names, configuration order.
    pub ban_channels: Vec<String>,
    /// Shared per-channel ban capacity.
    pub capacity: usize,
    /// Raw-line template for the operational log; `{message}` is
    /// substituted. `None` keeps state changes in tracing only.
    pub log_template: Option<String>,
}

/// The invex engine: membership store, slot pool, and the grant relation
/// between them.
pub struct InvexEngine {
    config: EngineConfig,
    store: MembershipStore,
    pool: SlotPool,
    /// contact → channel holding its account ban
    assignments: HashMap<String, String>,
    bootstrapped: bool,
}

impl InvexEngine {
    /// Engine with an empty store and an idle pool in configuration order.
    pub fn new(config: EngineConfig) -> Self {
        let pool = SlotPool::new(config.ban_channels.iter().cloned(), config.capacity);
        Self {
            config,
            store: MembershipStore::new(),
            pool,
            assignments: HashMap::new(),
            bootstrapped: false,
        }
    }

    /// Whether bootstrap reconciliation has completed.
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Channel holding a contact's ban, if granted.
    pub fn assignment_of(&self, contact: &str) -> Option<&str> {
        self.assignments.get(contact).map(String::as_str)
    }

    /// The membership relation.
    pub fn store(&self) -> &MembershipStore {
        &self.store
    }

    /// The slot pool.
    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    /// Fetch the full directory membership, inverted to contact→projects.
    ///
    /// Sends one listing request and collects page lines until the
    /// match-count sentinel. A page that fails the full capture is
    /// skipped; only the sentinel ends collection.
    async fn fetch_directory<T>(&self, io: &mut T) -> Result<HashMap<String, HashSet<String>>>
    where
        T: CommandSink + MessageWaiter + Send,
    {
        io.send(Line::cmd("PRIVMSG", &[DIRECTORY_SERVICE, "LIST *"]))
            .await?;

        let patterns: [&regex::Regex; 2] = [&DIRECTORY_ENTRY, &DIRECTORY_END];
        let mut desired: HashMap<String, HashSet<String>> = HashMap::new();
        loop {
            let reply = io.wait_for(DIRECTORY_SERVICE, &patterns).await?;
            if reply.pattern != 0 {
                break;
            }
            let Some(listing) = parse_listing(&reply.text) else {
                debug!("unparseable directory page: {}", reply.text);
                continue;
            };
            for contact in listing.contacts {
                desired
                    .entry(contact)
                    .or_default()
                    .insert(listing.project.clone());
            }
        }
        Ok(desired)
    }

    /// One-shot reconciliation.
    ///
    /// `live` is the observed ban list per pooled channel. The store is
    /// replaced last, so an aborted directory query leaves the engine
    /// uninitialized rather than half-synced.
    pub async fn bootstrap<T>(&mut self, io: &mut T, live: &[ChannelBans]) -> Result<BootstrapReport>
    where
        T: CommandSink + MessageWaiter + Send,
    {
        let desired = self.fetch_directory(io).await?;

        // Live account bans, and per-channel totals. Foreign bans occupy
        // capacity too.
        let mut live_accounts: HashMap<String, String> = HashMap::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for bans in live {
            counts.insert(bans.channel.clone(), bans.masks.len());
            for mask in &bans.masks {
                if let Some(account) = mask_account(mask) {
                    live_accounts.insert(casefold(account), bans.channel.clone());
                }
            }
        }

        let mut report = BootstrapReport::default();

        // Stale: banned accounts that are no longer group contacts.
        let mut stale: Vec<(String, String)> = live_accounts
            .iter()
            .filter(|(account, _)| !desired.contains_key(*account))
            .map(|(account, channel)| (account.clone(), channel.clone()))
            .collect();
        stale.sort();
        for (account, channel) in &stale {
            let mask = account_mask(account);
            io.send(Line::cmd("MODE", &[channel.as_str(), "-b", &mask]))
                .await?;
            if let Some(count) = counts.get_mut(channel) {
                *count = count.saturating_sub(1);
            }
            report.removed += 1;
        }

        // Rebuild the preference order from the post-removal counts and
        // rotate the full prefix away from the front.
        let mut pool = SlotPool::from_counts(
            self.config
                .ban_channels
                .iter()
                .map(|channel| (channel.clone(), counts.get(channel).copied().unwrap_or(0))),
            self.config.capacity,
        );
        pool.demote_full_prefix();

        // Contacts already banned keep their grant where it is.
        let mut assignments: HashMap<String, String> = HashMap::new();
        for (account, channel) in &live_accounts {
            if desired.contains_key(account) {
                assignments.insert(account.clone(), channel.clone());
            }
        }

        // Missing: group contacts with no live account ban.
        let mut missing: Vec<&String> = desired
            .keys()
            .filter(|account| !live_accounts.contains_key(*account))
            .collect();
        missing.sort();
        for account in missing {
            match pool.assign() {
                Ok(channel) => {
                    let mask = account_mask(account);
                    io.send(Line::cmd("MODE", &[channel.as_str(), "+b", &mask]))
                        .await?;
                    assignments.insert(account.clone(), channel);
                    report.added += 1;
                }
                Err(err) => {
                    warn!("{err}; leaving group contact {account} unassigned");
                    self.operational_log(
                        io,
                        &format!("invex pool exhausted; leaving {account} unassigned"),
                    )
                    .await?;
                    report.unassigned += 1;
                }
            }
        }

        self.store.replace(desired);
        self.pool = pool;
        self.assignments = assignments;
        self.bootstrapped = true;

        info!(
            added = report.added,
            removed = report.removed,
            unassigned = report.unassigned,
            contacts = self.store.contact_count(),
            projects = self.store.project_count(),
            "bootstrap reconciliation complete"
        );
        Ok(report)
    }

    /// Apply one service notification.
    ///
    /// Identifiers are casefolded here; each arm upholds the grant
    /// invariants on its own, and unknown references are no-ops.
    pub async fn handle<S>(&mut self, io: &mut S, notification: Notification) -> Result<()>
    where
        S: CommandSink + Send,
    {
        match notification {
            Notification::Rename { old, new } => {
                self.handle_rename(io, &casefold(&old), &casefold(&new)).await
            }
            Notification::ContactAdd { contact, project } => {
                self.handle_contact_add(io, &casefold(&contact), &casefold(&project))
                    .await
            }
            Notification::ContactRemove { contact, project } => {
                self.handle_contact_remove(io, &casefold(&contact), &casefold(&project))
                    .await
            }
            Notification::ProjectDrop { project } => {
                self.handle_project_drop(io, &casefold(&project)).await
            }
        }
    }

    /// Re-key a granted contact: one replace on the same channel, store
    /// and grant re-keyed. Contacts without a grant are left alone.
    async fn handle_rename<S>(&mut self, io: &mut S, old: &str, new: &str) -> Result<()>
    where
        S: CommandSink + Send,
    {
        let Some(channel) = self.assignments.remove(old) else {
            return Ok(());
        };
        self.store.rename(old, new);
        self.assignments.insert(new.to_string(), channel.clone());

        let old_mask = account_mask(old);
        let new_mask = account_mask(new);
        io.send(Line::cmd(
            "MODE",
            &[channel.as_str(), "-b+b", &old_mask, &new_mask],
        ))
        .await?;
        self.operational_log(io, &format!("renaming invex for {old} -> {new}"))
            .await
    }

    async fn handle_contact_add<S>(&mut self, io: &mut S, contact: &str, project: &str) -> Result<()>
    where
        S: CommandSink + Send,
    {
        let newly_relevant = self.store.add(contact, project);
        if !newly_relevant {
            // Only the project relation changed; the grant stands.
            return Ok(());
        }
        match self.pool.assign() {
            Ok(channel) => {
                self.assignments.insert(contact.to_string(), channel.clone());
                let mask = account_mask(contact);
                io.send(Line::cmd("MODE", &[channel.as_str(), "+b", &mask]))
                    .await?;
                self.operational_log(io, &format!("adding invex for new GC {contact}"))
                    .await
            }
            Err(err) => {
                warn!("{err}; leaving new group contact {contact} unassigned");
                self.operational_log(
                    io,
                    &format!("invex pool exhausted; leaving {contact} unassigned"),
                )
                .await
            }
        }
    }

    async fn handle_contact_remove<S>(
        &mut self,
        io: &mut S,
        contact: &str,
        project: &str,
    ) -> Result<()>
    where
        S: CommandSink + Send,
    {
        let outcome = self.store.remove(contact, project);
        if outcome.contact_dropped {
            self.retire_contact(io, contact).await?;
        }
        Ok(())
    }

    async fn handle_project_drop<S>(&mut self, io: &mut S, project: &str) -> Result<()>
    where
        S: CommandSink + Send,
    {
        for contact in self.store.drop_project(project) {
            self.retire_contact(io, &contact).await?;
        }
        Ok(())
    }

    /// Shed a no-longer-relevant contact's ban and put the freed capacity
    /// at the front of the preference order.
    async fn retire_contact<S>(&mut self, io: &mut S, contact: &str) -> Result<()>
    where
        S: CommandSink + Send,
    {
        let Some(channel) = self.assignments.remove(contact) else {
            // Tracked without a grant under pool exhaustion.
            return Ok(());
        };
        self.pool.release(&channel);
        let mask = account_mask(contact);
        io.send(Line::cmd("MODE", &[channel.as_str(), "-b", &mask]))
            .await?;
        self.operational_log(io, &format!("removing invex for no-longer-GC {contact}"))
            .await
    }

    /// Emit a state-change message through the configured raw-line
    /// template, if any.
    async fn operational_log<S>(&self, io: &mut S, message: &str) -> Result<()>
    where
        S: CommandSink + Send,
    {
        debug!(%message, "invex state change");
        if let Some(template) = &self.config.log_template {
            let raw = template.replace("{message}", message);
            if let Some(line) = Line::parse(&raw) {
                io.send(line).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::io::Wait;
    use async_trait::async_trait;
    use regex::Regex;
    use std::collections::VecDeque;

    /// In-memory transport: records sent lines, scripts directory replies.
    struct FakeIo {
        sent: Vec<String>,
        replies: VecDeque<String>,
    }

    impl FakeIo {
        fn new() -> Self {
            Self {
                sent: Vec::new(),
                replies: VecDeque::new(),
            }
        }

        fn with_directory(lines: &[&str]) -> Self {
            Self {
                sent: Vec::new(),
                replies: lines.iter().map(|l| l.to_string()).collect(),
            }
        }

        fn mode_lines(&self) -> Vec<&str> {
            self.sent
                .iter()
                .filter(|l| l.starts_with("MODE "))
                .map(String::as_str)
                .collect()
        }

        fn log_lines(&self) -> Vec<&str> {
            self.sent
                .iter()
                .filter(|l| l.starts_with("PRIVMSG #garnet-log"))
                .map(String::as_str)
                .collect()
        }

        fn clear(&mut self) {
            self.sent.clear();
        }
    }

    #[async_trait]
    impl CommandSink for FakeIo {
        async fn send(&mut self, line: Line) -> Result<()> {
            self.sent.push(line.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl MessageWaiter for FakeIo {
        async fn wait_for(&mut self, _source: &str, patterns: &[&Regex]) -> Result<Wait> {
            while let Some(text) = self.replies.pop_front() {
                if let Some(pattern) = patterns.iter().position(|p| p.is_match(&text)) {
                    return Ok(Wait { pattern, text });
                }
            }
            Err(Error::TransportClosed("directory listing"))
        }
    }

    fn engine(channels: &[&str], capacity: usize) -> InvexEngine {
        InvexEngine::new(EngineConfig {
            ban_channels: channels.iter().map(|c| c.to_string()).collect(),
            capacity,
            log_template: Some("PRIVMSG #garnet-log :{message}".to_string()),
        })
    }

    fn bans(channel: &str, masks: &[&str]) -> ChannelBans {
        ChannelBans {
            channel: channel.to_string(),
            masks: masks.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// I2: every pooled channel's count equals its granted bans (valid
    /// whenever the live state carried no foreign bans).
    fn assert_counts_match_grants(engine: &InvexEngine) {
        let mut per_channel: HashMap<&str, usize> = HashMap::new();
        for channel in engine.assignments.values() {
            *per_channel.entry(channel.as_str()).or_default() += 1;
        }
        for slot in engine.pool().order() {
            assert_eq!(
                slot.count,
                per_channel.get(slot.channel.as_str()).copied().unwrap_or(0),
                "count drift on {}",
                slot.channel
            );
        }
    }

    #[tokio::test]
    async fn scenario_a_bootstrap_packs_front_slot() {
        let mut engine = engine(&["#invex00", "#invex01"], 2);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice, bob)",
            "1 matches for list *",
        ]);

        let report = engine
            .bootstrap(&mut io, &[bans("#invex00", &[]), bans("#invex01", &[])])
            .await
            .unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.removed, 0);
        assert_eq!(report.unassigned, 0);
        // Ascending order, both packed onto the first channel.
        assert_eq!(
            io.mode_lines(),
            vec![
                "MODE #invex00 +b $a:alice",
                "MODE #invex00 +b $a:bob",
            ]
        );
        assert_eq!(engine.pool().count_of("#invex00"), Some(2));
        assert_eq!(engine.pool().count_of("#invex01"), Some(0));
        assert_counts_match_grants(&engine);
    }

    #[tokio::test]
    async fn scenario_b_bootstrap_removes_stale_ban() {
        let mut engine = engine(&["#invex00", "#invex01"], 2);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice)",
            "1 matches for list *",
        ]);

        let report = engine
            .bootstrap(
                &mut io,
                &[
                    bans("#invex00", &["$a:alice", "$a:carol"]),
                    bans("#invex01", &[]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.added, 0);
        assert_eq!(io.mode_lines(), vec!["MODE #invex00 -b $a:carol"]);
        assert_eq!(engine.pool().count_of("#invex00"), Some(1));
        assert_eq!(engine.assignment_of("alice"), Some("#invex00"));
        assert!(engine.assignment_of("carol").is_none());
    }

    #[tokio::test]
    async fn bootstrap_keeps_existing_grants_silent() {
        let mut engine = engine(&["#invex00", "#invex01"], 2);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice)",
            "1 matches for list *",
        ]);

        engine
            .bootstrap(&mut io, &[bans("#invex00", &[]), bans("#invex01", &["$a:alice"])])
            .await
            .unwrap();

        // Already consistent: no mode traffic at all.
        assert!(io.mode_lines().is_empty());
        assert_eq!(engine.assignment_of("alice"), Some("#invex01"));
    }

    #[tokio::test]
    async fn bootstrap_inverts_multi_project_membership() {
        let mut engine = engine(&["#invex00"], 4);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice, bob)",
            "- proj2 (#proj2; alice)",
            "- emptyproj (#emptyproj; no contacts)",
            "3 matches for list *",
        ]);

        let report = engine.bootstrap(&mut io, &[bans("#invex00", &[])]).await.unwrap();

        // One ban per contact, however many projects they are on.
        assert_eq!(report.added, 2);
        assert_eq!(engine.store().contact_count(), 2);
        assert_eq!(engine.store().project_count(), 2);
        assert_eq!(
            engine.store().projects_of("alice").map(|p| p.len()),
            Some(2)
        );
        assert_counts_match_grants(&engine);
    }

    #[tokio::test]
    async fn bootstrap_counts_foreign_bans_toward_capacity() {
        let mut engine = engine(&["#invex00", "#invex01"], 2);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice, bob, carol)",
            "1 matches for list *",
        ]);

        engine
            .bootstrap(
                &mut io,
                &[
                    bans("#invex00", &["*!*@198.51.100.7", "$a:alice"]),
                    bans("#invex01", &[]),
                ],
            )
            .await
            .unwrap();

        // #invex00 is full (foreign ban + alice); bob and carol go to #invex01.
        assert_eq!(
            io.mode_lines(),
            vec![
                "MODE #invex01 +b $a:bob",
                "MODE #invex01 +b $a:carol",
            ]
        );
    }

    #[tokio::test]
    async fn bootstrap_reports_exhaustion_without_failing() {
        let mut engine = engine(&["#invex00"], 1);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice, bob)",
            "1 matches for list *",
        ]);

        let report = engine.bootstrap(&mut io, &[bans("#invex00", &[])]).await.unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.unassigned, 1);
        // bob stays tracked, just without a grant.
        assert!(engine.store().contains("bob"));
        assert!(engine.assignment_of("bob").is_none());
        assert_eq!(
            io.log_lines(),
            vec!["PRIVMSG #garnet-log :invex pool exhausted; leaving bob unassigned"]
        );
    }

    #[tokio::test]
    async fn bootstrap_failure_leaves_engine_uninitialized() {
        let mut engine = engine(&["#invex00"], 2);
        // Listing never terminates: the scripted replies run dry.
        let mut io = FakeIo::with_directory(&["- proj1 (#proj1; alice)"]);

        let result = engine.bootstrap(&mut io, &[bans("#invex00", &[])]).await;

        assert!(result.is_err());
        assert!(!engine.is_bootstrapped());
        assert_eq!(engine.store().contact_count(), 0);
    }

    #[tokio::test]
    async fn p1_contact_add_is_idempotent() {
        let mut engine = engine(&["#invex00"], 4);
        let mut io = FakeIo::new();

        let add = Notification::ContactAdd {
            contact: "dave".into(),
            project: "proj1".into(),
        };
        engine.handle(&mut io, add.clone()).await.unwrap();
        let first = io.sent.clone();
        engine.handle(&mut io, add).await.unwrap();

        // Second application changed nothing and sent nothing new.
        assert_eq!(io.sent, first);
        assert_eq!(io.mode_lines(), vec!["MODE #invex00 +b $a:dave"]);
        assert_eq!(engine.store().projects_of("dave").map(|p| p.len()), Some(1));
        assert_counts_match_grants(&engine);
    }

    #[tokio::test]
    async fn p3_second_project_does_not_move_or_duplicate_grant() {
        let mut engine = engine(&["#invex00", "#invex01"], 1);
        let mut io = FakeIo::new();

        engine
            .handle(
                &mut io,
                Notification::ContactAdd {
                    contact: "dave".into(),
                    project: "proj1".into(),
                },
            )
            .await
            .unwrap();
        engine
            .handle(
                &mut io,
                Notification::ContactAdd {
                    contact: "dave".into(),
                    project: "proj2".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(io.mode_lines(), vec!["MODE #invex00 +b $a:dave"]);
        assert_eq!(engine.assignment_of("dave"), Some("#invex00"));
        assert_counts_match_grants(&engine);
    }

    #[tokio::test]
    async fn scenario_c_add_under_exhaustion_tracks_without_grant() {
        let mut engine = engine(&["#invex00"], 1);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice)",
            "1 matches for list *",
        ]);
        engine.bootstrap(&mut io, &[bans("#invex00", &[])]).await.unwrap();
        io.clear();

        engine
            .handle(
                &mut io,
                Notification::ContactAdd {
                    contact: "dave".into(),
                    project: "proj2".into(),
                },
            )
            .await
            .unwrap();

        assert!(io.mode_lines().is_empty());
        assert!(engine.store().contains("dave"));
        assert!(engine
            .store()
            .projects_of("dave")
            .is_some_and(|p| p.contains("proj2")));
        assert!(engine.assignment_of("dave").is_none());
        assert_eq!(
            io.log_lines(),
            vec!["PRIVMSG #garnet-log :invex pool exhausted; leaving dave unassigned"]
        );
    }

    #[tokio::test]
    async fn scenario_d_freed_slot_is_reused_first() {
        let mut engine = engine(&["#invex00", "#invex01"], 1);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice)",
            "- proj2 (#proj2; dave)",
            "2 matches for list *",
        ]);
        engine
            .bootstrap(&mut io, &[bans("#invex00", &[]), bans("#invex01", &[])])
            .await
            .unwrap();
        let dave_channel = engine.assignment_of("dave").unwrap().to_string();
        io.clear();

        engine
            .handle(
                &mut io,
                Notification::ContactRemove {
                    contact: "dave".into(),
                    project: "proj2".into(),
                },
            )
            .await
            .unwrap();
        let expected_remove = format!("MODE {dave_channel} -b $a:dave");
        assert_eq!(io.mode_lines(), vec![expected_remove.as_str()]);
        io.clear();

        engine
            .handle(
                &mut io,
                Notification::ContactAdd {
                    contact: "erin".into(),
                    project: "proj3".into(),
                },
            )
            .await
            .unwrap();

        // erin lands on the channel dave just vacated.
        assert_eq!(engine.assignment_of("erin"), Some(dave_channel.as_str()));
        assert_counts_match_grants(&engine);
    }

    #[tokio::test]
    async fn scenario_e_rename_replaces_mask_in_place() {
        let mut engine = engine(&["#invex00"], 2);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice)",
            "- proj2 (#proj2; alice)",
            "2 matches for list *",
        ]);
        engine.bootstrap(&mut io, &[bans("#invex00", &[])]).await.unwrap();
        io.clear();

        engine
            .handle(
                &mut io,
                Notification::Rename {
                    old: "alice".into(),
                    new: "alice2".into(),
                },
            )
            .await
            .unwrap();

        // One replace command, same channel, count untouched.
        assert_eq!(
            io.mode_lines(),
            vec!["MODE #invex00 -b+b $a:alice $a:alice2"]
        );
        assert_eq!(engine.pool().count_of("#invex00"), Some(1));
        assert_eq!(engine.assignment_of("alice2"), Some("#invex00"));
        assert!(engine.assignment_of("alice").is_none());
        assert!(engine
            .store()
            .projects_of("alice2")
            .is_some_and(|p| p.contains("proj1") && p.contains("proj2")));
        assert!(!engine.store().contains("alice"));
    }

    #[tokio::test]
    async fn rename_of_ungranted_contact_is_noop() {
        let mut engine = engine(&["#invex00"], 4);
        let mut io = FakeIo::new();

        engine
            .handle(
                &mut io,
                Notification::Rename {
                    old: "nobody".into(),
                    new: "somebody".into(),
                },
            )
            .await
            .unwrap();

        assert!(io.sent.is_empty());
        assert!(!engine.store().contains("somebody"));
    }

    #[tokio::test]
    async fn unknown_remove_and_drop_are_noops() {
        let mut engine = engine(&["#invex00"], 4);
        let mut io = FakeIo::new();

        engine
            .handle(
                &mut io,
                Notification::ContactRemove {
                    contact: "ghost".into(),
                    project: "nosuch".into(),
                },
            )
            .await
            .unwrap();
        engine
            .handle(
                &mut io,
                Notification::ProjectDrop {
                    project: "nosuch".into(),
                },
            )
            .await
            .unwrap();

        assert!(io.sent.is_empty());
    }

    #[tokio::test]
    async fn project_drop_retires_each_newly_irrelevant_contact() {
        let mut engine = engine(&["#invex00"], 4);
        let mut io = FakeIo::with_directory(&[
            "- proj1 (#proj1; alice, bob)",
            "- proj2 (#proj2; bob)",
            "2 matches for list *",
        ]);
        engine.bootstrap(&mut io, &[bans("#invex00", &[])]).await.unwrap();
        io.clear();

        engine
            .handle(
                &mut io,
                Notification::ProjectDrop {
                    project: "proj1".into(),
                },
            )
            .await
            .unwrap();

        // alice lost her last membership; bob survives via proj2.
        assert_eq!(io.mode_lines(), vec!["MODE #invex00 -b $a:alice"]);
        assert!(!engine.store().contains("alice"));
        assert!(engine.store().contains("bob"));
        assert_eq!(engine.pool().count_of("#invex00"), Some(1));
        assert_counts_match_grants(&engine);
    }

    #[tokio::test]
    async fn identifiers_are_casefolded_on_entry() {
        let mut engine = engine(&["#invex00"], 4);
        let mut io = FakeIo::new();

        engine
            .handle(
                &mut io,
                Notification::ContactAdd {
                    contact: "SandCat".into(),
                    project: "JessTest".into(),
                },
            )
            .await
            .unwrap();

        assert!(engine.store().contains("sandcat"));
        assert!(engine
            .store()
            .projects_of("sandcat")
            .is_some_and(|p| p.contains("jesstest")));
        assert_eq!(io.mode_lines(), vec!["MODE #invex00 +b $a:sandcat"]);
    }
}
