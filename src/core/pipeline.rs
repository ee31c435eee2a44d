use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::automation::patterns::{analyze_patterns, builtin_patterns, ThreatPattern};
use crate::automation::store::AutomationStore;
use crate::config::Config;
use crate::core::filter::FilterState;
use crate::core::source::EventSource;
use crate::core::Event;
use crate::notifications::Notifier;
use crate::signals::{Analysis, SignalEngine};
use crate::webhook::{
    dispatch, intelligence_payload, rule_alert_payload, DeliveryError, DeliveryJob,
    DeliveryReport, WebhookClient,
};

/// Messages into the pipeline.
#[derive(Debug, Clone)]
pub enum PipelineInput {
    /// Replace the event snapshot and rescore.
    Events(Vec<Event>),
    Filters(FilterState),
    /// Re-read the event source and rescore.
    Rescan,
    Shutdown,
}

/// Messages from pipeline to the frontend.
#[derive(Debug, Clone)]
pub enum PipelineOutput {
    Pass(PassSummary),
    Delivery(DeliveryReport),
}

#[derive(Debug, Clone)]
pub struct PassSummary {
    pub analysis: Analysis,
    pub rules_fired: usize,
    pub pattern_alerts: usize,
}

/// State carried between passes of the watch loop.
pub struct Pipeline {
    engine: SignalEngine,
    filters: FilterState,
    source: Option<EventSource>,
    events: Vec<Event>,
    store: AutomationStore,
    patterns: Vec<ThreatPattern>,
    /// (rule id, event id) pairs already delivered this session.
    fired: HashSet<(String, String)>,
    /// (pattern id, event id) pairs already counted as pattern evidence.
    detected: HashSet<(String, String)>,
    client: Arc<WebhookClient>,
    notifier: Notifier,
    report_tx: mpsc::Sender<DeliveryReport>,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        store: AutomationStore,
        source: Option<EventSource>,
        report_tx: mpsc::Sender<DeliveryReport>,
    ) -> Result<Self, DeliveryError> {
        Ok(Self {
            engine: SignalEngine::new(config.signals.alert_thresholds.clone()),
            filters: config.filters.clone(),
            source,
            events: Vec::new(),
            store,
            patterns: builtin_patterns(),
            fired: HashSet::new(),
            detected: HashSet::new(),
            client: Arc::new(WebhookClient::new(&config.webhook)?),
            notifier: Notifier::new(&config.notifications),
            report_tx,
        })
    }

    pub fn store(&self) -> &AutomationStore {
        &self.store
    }

    pub fn patterns(&self) -> &[ThreatPattern] {
        &self.patterns
    }

    pub fn set_events(&mut self, events: Vec<Event>) {
        self.events = events;
        self.forget_departed();
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
    }

    /// Re-read the event source. A failed read keeps the previous snapshot.
    pub fn reload(&mut self, now: DateTime<Utc>) {
        let Some(source) = &self.source else {
            return;
        };
        match source.load(now) {
            Ok(events) => {
                self.events = events;
                self.forget_departed();
            }
            Err(e) => warn!("Event reload failed, keeping {} events: {e}", self.events.len()),
        }
    }

    /// Drop dedup keys for events no longer in the snapshot.
    fn forget_departed(&mut self) {
        let ids: HashSet<&str> = self.events.iter().map(|e| e.id.as_str()).collect();
        self.fired.retain(|(_, event)| ids.contains(event.as_str()));
        self.detected.retain(|(_, event)| ids.contains(event.as_str()));
    }

    /// Score the current snapshot, fire matching rules once per event, and
    /// run the pattern pass.
    pub fn pass(&mut self, now: DateTime<Utc>) -> PassSummary {
        let filtered = self.filters.apply(&self.events, now);
        let analysis = self.engine.analyze(&filtered, now);

        for scored in &analysis.scored {
            self.notifier.notify(scored);
        }

        let live: Vec<_> = self
            .store
            .live_rules()
            .map(|(rule, webhook)| (rule.clone(), webhook.clone()))
            .collect();

        let mut rules_fired = 0;
        for (rule, webhook) in live {
            let matched = rule.evaluate(&filtered);
            for event in &matched {
                let key = (rule.id.clone(), event.id.clone());
                if self.fired.contains(&key) {
                    continue;
                }
                let position = filtered.iter().position(|e| e.id == event.id);
                let Some(i) = position else { continue };
                let payload = rule_alert_payload(
                    &rule,
                    &analysis.scored[i],
                    &analysis.sentiments[i].sentiment,
                    &matched,
                    now,
                );
                debug!("Rule {} fired on event {}", rule.name, event.id);
                dispatch(
                    self.client.clone(),
                    DeliveryJob {
                        webhook: webhook.clone(),
                        rule_id: Some(rule.id.clone()),
                        payload,
                    },
                    self.report_tx.clone(),
                );
                match self.store.record_rule_fire(&rule.id, now) {
                    Ok(next) => self.store = next,
                    Err(e) => warn!("Could not record fire of {}: {e}", rule.name),
                }
                self.fired.insert(key);
                rules_fired += 1;
            }
        }

        // Each event counts once per pattern, so an unchanged snapshot neither
        // raises confidence nor re-sends an alert.
        let mut pattern_alerts = 0;
        let target = self.store.first_active_webhook().cloned();
        let patterns = std::mem::take(&mut self.patterns);
        for pattern in patterns {
            let fresh: Vec<Event> = filtered
                .iter()
                .filter(|e| !self.detected.contains(&(pattern.id.clone(), e.id.clone())))
                .cloned()
                .collect();
            let Some(pass) = analyze_patterns(std::slice::from_ref(&pattern), &fresh, now).pop() else {
                self.patterns.push(pattern);
                continue;
            };
            for event in fresh.iter().filter(|e| pattern.matcher.matches(e)) {
                self.detected.insert((pattern.id.clone(), event.id.clone()));
            }
            if pass.matched > 0 && pass.pattern.raises_alert() {
                if let Some(webhook) = &target {
                    info!(
                        "Pattern {} detected ({:.0}% confidence)",
                        pass.pattern.name, pass.pattern.confidence
                    );
                    dispatch(
                        self.client.clone(),
                        DeliveryJob {
                            webhook: webhook.clone(),
                            rule_id: None,
                            payload: intelligence_payload(&pass.pattern, &filtered, now),
                        },
                        self.report_tx.clone(),
                    );
                    pattern_alerts += 1;
                } else {
                    debug!("Pattern {} detected but no active webhook", pass.pattern.name);
                }
            }
            self.patterns.push(pass.pattern);
        }

        info!(
            "Pass complete: {} events, {} critical, {rules_fired} rule deliveries, {pattern_alerts} pattern alerts",
            analysis.event_count,
            analysis.threat.critical_threats
        );
        PassSummary {
            analysis,
            rules_fired,
            pattern_alerts,
        }
    }

    /// Log a finished delivery. Failures are surfaced through the notifier.
    pub fn record_delivery(&mut self, report: &DeliveryReport) {
        if !report.success() {
            self.notifier.notify_failure(report);
        }
        match self.store.record_delivery(report.clone().into_trigger()) {
            Ok(next) => self.store = next,
            Err(e) => warn!("Delivery for unknown webhook {}: {e}", report.webhook_id),
        }
    }
}

/// Run the watch loop until shutdown: rescore on input, on every tick, and
/// record delivery outcomes as they come back.
pub async fn run_pipeline(
    mut pipeline: Pipeline,
    mut rx: mpsc::UnboundedReceiver<PipelineInput>,
    mut report_rx: mpsc::Receiver<DeliveryReport>,
    out_tx: mpsc::UnboundedSender<PipelineOutput>,
    period: Duration,
) -> Pipeline {
    let mut ticker = tokio::time::interval(period);
    let mut passes: u64 = 0;

    info!("Pipeline started, rescanning every {}s", period.as_secs());

    loop {
        let summary = tokio::select! {
            input = rx.recv() => match input {
                Some(PipelineInput::Events(events)) => {
                    pipeline.set_events(events);
                    pipeline.pass(Utc::now())
                }
                Some(PipelineInput::Filters(filters)) => {
                    pipeline.set_filters(filters);
                    pipeline.pass(Utc::now())
                }
                Some(PipelineInput::Rescan) => {
                    let now = Utc::now();
                    pipeline.reload(now);
                    pipeline.pass(now)
                }
                Some(PipelineInput::Shutdown) | None => break,
            },
            _ = ticker.tick() => {
                let now = Utc::now();
                pipeline.reload(now);
                pipeline.pass(now)
            }
            Some(report) = report_rx.recv() => {
                pipeline.record_delivery(&report);
                if out_tx.send(PipelineOutput::Delivery(report)).is_err() {
                    info!("Output channel closed, stopping pipeline");
                    break;
                }
                continue;
            }
        };

        passes += 1;
        if out_tx.send(PipelineOutput::Pass(summary)).is_err() {
            info!("Output channel closed, stopping pipeline");
            break;
        }
    }

    info!("Pipeline shutting down after {passes} passes");
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::condition::{AutomationCondition, ConditionType, ConditionValue, Operator};
    use crate::automation::{AutomationRule, Webhook};
    use crate::config::WebhookSpec;
    use crate::core::filter::TimeRange;
    use crate::core::{test_event, Severity};

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    fn make_store(url: &str) -> AutomationStore {
        let now = Utc::now();
        let spec = WebhookSpec {
            id: Some("ops".into()),
            name: "Ops workflow".into(),
            url: url.into(),
            active: true,
            workflow_id: None,
            description: None,
            tags: vec![],
            username: None,
            password: None,
        };
        let rule = AutomationRule {
            id: "crit".into(),
            name: "Critical".into(),
            webhook_id: "ops".into(),
            conditions: vec![AutomationCondition::new(
                ConditionType::Severity,
                Operator::Equals,
                ConditionValue::Text("critical".into()),
            )],
            is_active: true,
            description: None,
            created_at: now,
            last_triggered: None,
            trigger_count: 0,
        };
        AutomationStore::default()
            .add_webhook(Webhook::from_spec(&spec, now))
            .unwrap()
            .add_rule(rule)
            .unwrap()
    }

    fn make_config() -> Config {
        let mut config = Config::default();
        config.notifications.enabled = false;
        config.webhook.timeout_secs = 2;
        config.filters.time_range = TimeRange::All;
        config
    }

    fn make_events() -> Vec<Event> {
        vec![
            test_event("1", Severity::Critical, "Cyber attack on grid", ""),
            test_event("2", Severity::Critical, "Missile test", ""),
            test_event("3", Severity::Low, "Trade summit", ""),
        ]
    }

    #[tokio::test]
    async fn rule_fires_once_per_event() {
        let (report_tx, mut report_rx) = mpsc::channel(16);
        let mut pipeline =
            Pipeline::new(&make_config(), make_store(&closed_port_url()), None, report_tx).unwrap();
        pipeline.set_events(make_events());

        let first = pipeline.pass(Utc::now());
        assert_eq!(first.rules_fired, 2);
        assert_eq!(first.analysis.event_count, 3);
        assert_eq!(pipeline.store().rules()[0].trigger_count, 2);

        let second = pipeline.pass(Utc::now());
        assert_eq!(second.rules_fired, 0);
        assert_eq!(pipeline.store().rules()[0].trigger_count, 2);

        let mut extra = make_events();
        extra.push(test_event("4", Severity::Critical, "Port seized", ""));
        pipeline.set_events(extra);
        assert_eq!(pipeline.pass(Utc::now()).rules_fired, 1);

        // Three rule deliveries and one pattern alert for the cyber event.
        let mut rule_reports = 0;
        for _ in 0..4 {
            let report = report_rx.recv().await.unwrap();
            assert!(!report.success());
            if report.rule_id.is_some() {
                rule_reports += 1;
            }
            pipeline.record_delivery(&report);
        }
        assert_eq!(rule_reports, 3);
        let metrics = pipeline.store().metrics(Utc::now());
        assert_eq!(metrics.success_rate, 0.0);
        assert_eq!(metrics.total_triggers, 4);
        assert_eq!(pipeline.store().triggers().len(), 4);
        assert_eq!(pipeline.store().rules()[0].trigger_count, 3);
    }

    #[tokio::test]
    async fn cyber_pattern_alerts_once_detected() {
        let (report_tx, mut report_rx) = mpsc::channel(16);
        let mut pipeline =
            Pipeline::new(&make_config(), make_store(&closed_port_url()), None, report_tx).unwrap();
        pipeline.set_events(make_events());
        let summary = pipeline.pass(Utc::now());
        assert_eq!(summary.pattern_alerts, 1);
        assert_eq!(pipeline.patterns()[0].confidence, 92.0);

        let mut intelligence = 0;
        for _ in 0..3 {
            let report = report_rx.recv().await.unwrap();
            if report.rule_id.is_none() {
                intelligence += 1;
                assert_eq!(report.payload["intelligence_alert"], true);
            }
        }
        assert_eq!(intelligence, 1);
    }

    #[tokio::test]
    async fn unchanged_snapshot_keeps_pattern_quiet() {
        let (report_tx, _report_rx) = mpsc::channel(16);
        let mut pipeline =
            Pipeline::new(&make_config(), make_store(&closed_port_url()), None, report_tx).unwrap();
        pipeline.set_events(make_events());
        assert_eq!(pipeline.pass(Utc::now()).pattern_alerts, 1);
        assert_eq!(pipeline.patterns()[0].confidence, 92.0);

        for _ in 0..3 {
            assert_eq!(pipeline.pass(Utc::now()).pattern_alerts, 0);
        }
        assert_eq!(pipeline.patterns()[0].confidence, 92.0);

        let mut extra = make_events();
        extra.push(test_event("5", Severity::Critical, "Second cyber intrusion", ""));
        pipeline.set_events(extra);
        assert_eq!(pipeline.pass(Utc::now()).pattern_alerts, 1);
        assert_eq!(pipeline.patterns()[0].confidence, 95.0);
    }

    #[tokio::test]
    async fn departed_events_are_forgotten() {
        let (report_tx, _report_rx) = mpsc::channel(16);
        let mut pipeline =
            Pipeline::new(&make_config(), make_store(&closed_port_url()), None, report_tx).unwrap();
        pipeline.set_events(make_events());
        assert_eq!(pipeline.pass(Utc::now()).rules_fired, 2);
        assert_eq!(pipeline.fired.len(), 2);
        assert_eq!(pipeline.detected.len(), 1);

        pipeline.set_events(vec![test_event("3", Severity::Low, "Trade summit", "")]);
        assert!(pipeline.fired.is_empty());
        assert!(pipeline.detected.is_empty());

        // An event that comes back is new to the session again.
        pipeline.set_events(make_events());
        assert_eq!(pipeline.pass(Utc::now()).rules_fired, 2);
    }

    #[tokio::test]
    async fn filters_narrow_the_pass() {
        let (report_tx, _report_rx) = mpsc::channel(16);
        let mut pipeline =
            Pipeline::new(&make_config(), AutomationStore::default(), None, report_tx).unwrap();
        pipeline.set_events(make_events());
        pipeline.set_filters(FilterState {
            severity: vec![Severity::Low],
            time_range: TimeRange::All,
            ..Default::default()
        });
        let summary = pipeline.pass(Utc::now());
        assert_eq!(summary.analysis.event_count, 1);
        assert_eq!(summary.rules_fired, 0);
        assert_eq!(summary.pattern_alerts, 0);
    }

    #[tokio::test]
    async fn watch_loop_handles_inputs_until_shutdown() {
        let (report_tx, report_rx) = mpsc::channel(16);
        let pipeline =
            Pipeline::new(&make_config(), AutomationStore::default(), None, report_tx).unwrap();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_pipeline(
            pipeline,
            in_rx,
            report_rx,
            out_tx,
            Duration::from_secs(3600),
        ));

        // The first tick fires immediately on the empty snapshot.
        match out_rx.recv().await.unwrap() {
            PipelineOutput::Pass(summary) => assert_eq!(summary.analysis.event_count, 0),
            other => panic!("unexpected output {other:?}"),
        }

        in_tx.send(PipelineInput::Events(make_events())).unwrap();
        match out_rx.recv().await.unwrap() {
            PipelineOutput::Pass(summary) => assert_eq!(summary.analysis.event_count, 3),
            other => panic!("unexpected output {other:?}"),
        }

        in_tx.send(PipelineInput::Shutdown).unwrap();
        let pipeline = handle.await.unwrap();
        assert!(pipeline.store().triggers().is_empty());
    }

    #[tokio::test]
    async fn rescan_reloads_source() {
        let (report_tx, _report_rx) = mpsc::channel(16);
        let mut pipeline = Pipeline::new(
            &make_config(),
            AutomationStore::default(),
            Some(EventSource::Sample),
            report_tx,
        )
        .unwrap();
        let now = Utc::now();
        pipeline.reload(now);
        assert_eq!(pipeline.pass(now).analysis.event_count, 8);
    }
}
