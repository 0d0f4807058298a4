//! YAML configuration (§6). Loaded once at process start; every rule
//! section is optional and defaults to disabled, so a trader can enable
//! exactly the subset they want. Validation failures map to
//! [`EngineError::ConfigInvalid`], which the process turns into exit code
//! 2 (§6, §7).

use crate::engine::{EngineConfig, TickTable};
use crate::error::EngineError;
use chrono::{Duration as ChronoDuration, NaiveTime, Weekday};
use riskguard_integration::collection::FnvIndexMap;
use riskguard_risk::rules::{
    AuthLossGuard, CooldownAfterLoss, DailyRealizedLoss, DailyRealizedProfit, DailyUnrealizedLoss, FrequencyTier,
    LossTier, MaxContracts, MaxContractsPerInstrument, MaxUnrealizedProfit, NoStopLossGrace, SessionBlockOutside,
    SymbolBlocks, TradeFrequencyLimit, TradeManagement,
};
use riskguard_risk::{AutomationRule, Rule};
use riskguard_sdk::{Money, SymbolRoot, TickInfo};
use serde::Deserialize;
use std::str::FromStr;

/// Top-level YAML document (§6: "general", "rules", "timers").
#[derive(Debug, Deserialize)]
pub struct RiskConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    pub timers: TimersConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub instruments: Vec<SymbolRoot>,
    pub timezone: String,
    pub database_path: String,
    pub tick_table: Vec<TickTableEntry>,
    /// Cadence of the market-data polling fallback (§4.9): "a background
    /// task at ≤2 Hz fetches the SDK-maintained last price". Clamped to
    /// at least one second so a misconfigured `0` can't spin the poll
    /// loop tighter than the spec's ceiling.
    #[serde(default = "default_market_data_check_interval_seconds")]
    pub check_interval_seconds: u64,
}

fn default_market_data_check_interval_seconds() -> u64 {
    2
}

#[derive(Debug, Deserialize)]
pub struct TickTableEntry {
    pub symbol_root: SymbolRoot,
    pub tick_size: Money,
    pub tick_value: Money,
}

#[derive(Debug, Deserialize)]
pub struct TimersConfig {
    pub daily_reset: DailyResetConfig,
}

#[derive(Debug, Deserialize)]
pub struct DailyResetConfig {
    /// `"HH:MM"` local wall-clock time.
    pub time: String,
    pub timezone: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub max_contracts: MaxContractsSection,
    #[serde(default)]
    pub max_contracts_per_instrument: MaxContractsPerInstrumentSection,
    #[serde(default)]
    pub daily_realized_loss: LimitSection,
    #[serde(default)]
    pub daily_realized_profit: TargetSection,
    #[serde(default)]
    pub daily_unrealized_loss: LimitSection,
    #[serde(default)]
    pub max_unrealized_profit: TargetSection,
    #[serde(default)]
    pub trade_frequency_limit: TradeFrequencySection,
    #[serde(default)]
    pub cooldown_after_loss: CooldownAfterLossSection,
    #[serde(default)]
    pub no_stop_loss_grace: NoStopLossGraceSection,
    #[serde(default)]
    pub session_block_outside: SessionBlockOutsideSection,
    #[serde(default)]
    pub auth_loss_guard: EnabledOnlySection,
    #[serde(default)]
    pub symbol_blocks: SymbolBlocksSection,
    #[serde(default)]
    pub trade_management: TradeManagementSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnabledOnlySection {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub limit: Money,
}

#[derive(Debug, Default, Deserialize)]
pub struct TargetSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub target: Money,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaxContractsSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub limit: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaxContractsPerInstrumentSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub default_limit: u32,
    #[serde(default)]
    pub instrument_limits: FnvIndexMap<SymbolRoot, u32>,
}

/// One rolling-window tier (§6: `limits: {per_minute, per_hour, per_session}`).
#[derive(Debug, Deserialize)]
pub struct FrequencyTierSection {
    pub limit: u32,
    pub window_seconds: i64,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct TradeFrequencySection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub limits: FnvIndexMap<String, FrequencyTierSection>,
}

/// One `{loss_amount, cooldown_duration}` tier (§6).
#[derive(Debug, Deserialize)]
pub struct LossTierSection {
    pub loss_amount: Money,
    pub cooldown_duration_seconds: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CooldownAfterLossSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub loss_thresholds: Vec<LossTierSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoStopLossGraceSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub require_within_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct AllowedHours {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionBlockOutsideSection {
    #[serde(default)]
    pub enabled: bool,
    pub allowed_hours: Option<AllowedHours>,
    pub timezone: Option<String>,
    /// Three-letter English weekday abbreviations, e.g. `["Mon", "Tue"]`.
    /// Absent means every weekday is allowed.
    pub allowed_weekdays: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SymbolBlocksSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub blocked_symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DistanceSection {
    #[serde(default)]
    pub enabled: bool,
    pub distance: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct TradeManagementSection {
    #[serde(default)]
    pub enabled: bool,
    pub auto_stop_loss: Option<DistanceSection>,
    pub auto_take_profit: Option<DistanceSection>,
    pub trailing_stop: Option<DistanceSection>,
}

impl RiskConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, EngineError> {
        serde_yaml::from_str(raw).map_err(|err| EngineError::ConfigInvalid(err.to_string()))
    }

    /// Builds the engine's runtime configuration: the tick table and the
    /// daily-reset clock settings (§6's `timers.daily_reset`).
    pub fn engine_config(&self) -> Result<EngineConfig, EngineError> {
        let tz = parse_timezone(&self.timers.daily_reset.timezone)?;
        let daily_reset_time = parse_hhmm(&self.timers.daily_reset.time)?;

        let mut tick_table = FnvIndexMap::default();
        for entry in &self.general.tick_table {
            tick_table.insert(entry.symbol_root.clone(), TickInfo::new(entry.tick_size, entry.tick_value));
        }
        for instrument in &self.general.instruments {
            if !tick_table.contains_key(instrument) {
                return Err(EngineError::ConfigInvalid(format!("no tick table entry for instrument {instrument}")));
            }
        }

        let trade_frequency_windows = self
            .rules
            .trade_frequency_limit
            .limits
            .values()
            .map(|tier| ChronoDuration::seconds(tier.window_seconds))
            .collect();

        Ok(EngineConfig {
            tick_table: TickTable(tick_table),
            daily_reset_time,
            tz: crate::clock::TzConverter::new(tz),
            trade_frequency_windows,
            market_data_poll_interval: std::time::Duration::from_secs(self.general.check_interval_seconds.max(1)),
        })
    }

    /// Builds the enabled [`Rule`]s in registry order (§4.11's numbering).
    pub fn build_rules(&self) -> Result<Vec<Box<dyn Rule>>, EngineError> {
        let r = &self.rules;
        let mut rules: Vec<Box<dyn Rule>> = Vec::new();

        rules.push(Box::new(MaxContracts { enabled: r.max_contracts.enabled, limit: r.max_contracts.limit }));
        rules.push(Box::new(MaxContractsPerInstrument {
            enabled: r.max_contracts_per_instrument.enabled,
            default_limit: r.max_contracts_per_instrument.default_limit,
            instrument_limits: r.max_contracts_per_instrument.instrument_limits.clone(),
        }));
        rules.push(Box::new(DailyRealizedLoss { enabled: r.daily_realized_loss.enabled, limit: r.daily_realized_loss.limit }));
        rules.push(Box::new(DailyUnrealizedLoss {
            enabled: r.daily_unrealized_loss.enabled,
            loss_limit: r.daily_unrealized_loss.limit,
        }));
        rules.push(Box::new(MaxUnrealizedProfit { enabled: r.max_unrealized_profit.enabled, target: r.max_unrealized_profit.target }));

        let mut frequency_tiers = Vec::new();
        for (name, tier) in &r.trade_frequency_limit.limits {
            frequency_tiers.push(FrequencyTier {
                name: Box::leak(name.clone().into_boxed_str()),
                window: ChronoDuration::seconds(tier.window_seconds),
                limit: tier.limit,
                cooldown_seconds: tier.cooldown_seconds,
            });
        }
        rules.push(Box::new(TradeFrequencyLimit::new(r.trade_frequency_limit.enabled, frequency_tiers)));

        let cooldown_tiers = r
            .cooldown_after_loss
            .loss_thresholds
            .iter()
            .map(|tier| LossTier { loss_amount: tier.loss_amount, cooldown_seconds: tier.cooldown_duration_seconds })
            .collect();
        rules.push(Box::new(CooldownAfterLoss::new(r.cooldown_after_loss.enabled, cooldown_tiers)));

        rules.push(Box::new(NoStopLossGrace {
            enabled: r.no_stop_loss_grace.enabled,
            require_within_seconds: r.no_stop_loss_grace.require_within_seconds,
        }));

        rules.push(Box::new(build_session_block_outside(&r.session_block_outside)?));
        rules.push(Box::new(AuthLossGuard { enabled: r.auth_loss_guard.enabled }));
        rules.push(Box::new(SymbolBlocks { enabled: r.symbol_blocks.enabled, blocked_symbols: r.symbol_blocks.blocked_symbols.clone() }));
        rules.push(Box::new(DailyRealizedProfit { enabled: r.daily_realized_profit.enabled, target: r.daily_realized_profit.target }));

        Ok(rules)
    }

    /// Builds the enabled [`AutomationRule`]s (only `trade_management`, §4.11 #12).
    pub fn build_automation_rules(&self) -> Vec<Box<dyn AutomationRule>> {
        let tm = &self.rules.trade_management;
        let stop = tm.auto_stop_loss.as_ref().map(|s| s.distance).unwrap_or(0);
        let target = tm.auto_take_profit.as_ref().map(|s| s.distance).unwrap_or(0);
        let (trailing_enabled, trailing_distance) =
            tm.trailing_stop.as_ref().map(|s| (s.enabled, s.distance)).unwrap_or((false, 0));

        vec![Box::new(TradeManagement::new(tm.enabled, stop, target, trailing_enabled, trailing_distance))]
    }
}

fn build_session_block_outside(section: &SessionBlockOutsideSection) -> Result<SessionBlockOutside, EngineError> {
    let hours = section.allowed_hours.as_ref();
    let start = hours.map(|h| parse_hhmm(&h.start)).transpose()?.unwrap_or(NaiveTime::MIN);
    let end = hours
        .map(|h| parse_hhmm(&h.end))
        .transpose()?
        .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 59).expect("valid constant time"));
    let timezone = match &section.timezone {
        Some(tz) => parse_timezone(tz)?,
        None => chrono_tz::UTC,
    };
    let allowed_weekdays = section
        .allowed_weekdays
        .as_ref()
        .map(|days| {
            days.iter()
                .map(|day| Weekday::from_str(day).map_err(|_| EngineError::ConfigInvalid(format!("invalid weekday {day}"))))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    Ok(SessionBlockOutside { enabled: section.enabled, start, end, timezone, allowed_weekdays })
}

fn parse_timezone(raw: &str) -> Result<chrono_tz::Tz, EngineError> {
    raw.parse().map_err(|_| EngineError::ConfigInvalid(format!("unknown timezone {raw}")))
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| EngineError::ConfigInvalid(format!("invalid HH:MM time {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
general:
  instruments: ["MNQ"]
  timezone: "America/New_York"
  database_path: "/var/lib/riskguard/riskguard.db"
  tick_table:
    - symbol_root: "MNQ"
      tick_size: "0.25"
      tick_value: "0.50"

rules:
  max_contracts:
    enabled: true
    limit: 10
  daily_realized_loss:
    enabled: true
    limit: "-500.00"
  trade_frequency_limit:
    enabled: true
    limits:
      per_minute:
        limit: 3
        window_seconds: 60
        cooldown_seconds: 120
  trade_management:
    enabled: true
    auto_stop_loss: { distance: 20 }
    auto_take_profit: { distance: 40 }
    trailing_stop: { enabled: true, distance: 10 }

timers:
  daily_reset:
    time: "17:00"
    timezone: "America/New_York"
"#
    }

    #[test]
    fn parses_a_complete_document() {
        let config = RiskConfig::from_yaml_str(sample_yaml()).unwrap();
        assert_eq!(config.general.instruments.len(), 1);
        assert!(config.rules.max_contracts.enabled);
        assert_eq!(config.rules.max_contracts.limit, 10);
    }

    #[test]
    fn missing_tick_table_entry_for_a_configured_instrument_is_invalid() {
        let yaml = r#"
general:
  instruments: ["ES"]
  timezone: "America/New_York"
  database_path: "/tmp/riskguard.db"
  tick_table: []
timers:
  daily_reset: { time: "17:00", timezone: "America/New_York" }
"#;
        let config = RiskConfig::from_yaml_str(yaml).unwrap();
        assert!(matches!(config.engine_config(), Err(EngineError::ConfigInvalid(_))));
    }

    #[test]
    fn builds_the_engine_config_from_the_sample_document() {
        let config = RiskConfig::from_yaml_str(sample_yaml()).unwrap();
        let engine_config = config.engine_config().unwrap();
        assert_eq!(engine_config.trade_frequency_windows.len(), 1);
        assert!(engine_config.tick_table.0.contains_key(&SymbolRoot::from("MNQ".to_string())));
        assert_eq!(engine_config.market_data_poll_interval, std::time::Duration::from_secs(2), "default is the spec's 2Hz-or-slower fallback");
    }

    #[test]
    fn check_interval_seconds_is_configurable_and_clamped_to_at_least_one_second() {
        let yaml = r#"
general:
  instruments: ["MNQ"]
  timezone: "America/New_York"
  database_path: "/tmp/riskguard.db"
  tick_table:
    - symbol_root: "MNQ"
      tick_size: "0.25"
      tick_value: "0.50"
  check_interval_seconds: 0
timers:
  daily_reset: { time: "17:00", timezone: "America/New_York" }
"#;
        let config = RiskConfig::from_yaml_str(yaml).unwrap();
        let engine_config = config.engine_config().unwrap();
        assert_eq!(engine_config.market_data_poll_interval, std::time::Duration::from_secs(1));
    }

    #[test]
    fn builds_thirteen_rules_in_registry_order() {
        let config = RiskConfig::from_yaml_str(sample_yaml()).unwrap();
        let rules = config.build_rules().unwrap();
        assert_eq!(rules.len(), 12);
        let automation = config.build_automation_rules();
        assert_eq!(automation.len(), 1);
    }

    #[test]
    fn rejects_an_unknown_timezone() {
        let yaml = r#"
general:
  instruments: []
  timezone: "Nowhere/City"
  database_path: "/tmp/riskguard.db"
  tick_table: []
timers:
  daily_reset: { time: "17:00", timezone: "Nowhere/City" }
"#;
        let config = RiskConfig::from_yaml_str(yaml).unwrap();
        assert!(matches!(config.engine_config(), Err(EngineError::ConfigInvalid(_))));
    }
}
