//! medtrans 命令行工具
//!
//! 读取 JSON 记录，交给规则引擎评估，并以 JSON 输出结果。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use medtrans_admin::{init_logging, ConfigManager};
use medtrans_core::utils::{parse_metric_key, parse_vital_value};
use medtrans_core::{Allergy, Booking, BookingStatus, TimelineEvent};
use medtrans_rules::{Checkpoint, RuleEngine};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// medtrans 命令行参数
#[derive(Parser, Debug)]
#[command(name = "medtrans")]
#[command(about = "医疗转运临床规则引擎")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 日志级别（覆盖配置文件）
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 对单个生命体征数值分级
    Classify {
        /// 指标键名，如 heart_rate
        #[arg(short, long)]
        metric: String,
        /// 数值，留空表示未测量
        #[arg(short, long, default_value = "")]
        value: String,
    },
    /// 血压组合分级
    BloodPressure {
        #[arg(short, long, default_value = "")]
        systolic: String,
        #[arg(short, long, default_value = "")]
        diastolic: String,
    },
    /// 检查药名与过敏清单是否冲突
    CheckAllergy {
        /// 过敏清单 JSON 文件
        #[arg(short, long)]
        allergies: String,
        /// 药物名称
        #[arg(short, long)]
        medication: String,
        /// 检查点
        #[arg(long, value_enum, default_value = "submission")]
        checkpoint: CheckpointArg,
    },
    /// 执行预约状态转换
    Transition {
        /// 预约 JSON 文件
        #[arg(short, long)]
        booking: String,
        /// 目标状态
        #[arg(short, long)]
        to: String,
        /// 操作人
        #[arg(short, long)]
        actor: String,
    },
    /// 列出当前状态允许的目标状态
    Permitted {
        #[arg(short, long)]
        status: String,
    },
    /// 组装时间线
    Timeline {
        /// 事件列表 JSON 文件
        #[arg(short, long)]
        events: String,
    },
    /// 输出生效的参考范围表
    Ranges {
        /// 只输出指定指标
        #[arg(short, long)]
        metric: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CheckpointArg {
    Keystroke,
    Selection,
    Submission,
}

impl From<CheckpointArg> for Checkpoint {
    fn from(arg: CheckpointArg) -> Self {
        match arg {
            CheckpointArg::Keystroke => Checkpoint::Keystroke,
            CheckpointArg::Selection => Checkpoint::Selection,
            CheckpointArg::Submission => Checkpoint::Submission,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(args.config.as_deref())?;
    let mut logging = manager.get_config().await.logging;
    if let Some(level) = args.log_level {
        logging.level = level;
    }
    init_logging(&logging)?;

    let engine = RuleEngine::with_ranges(manager.range_table().await?);
    info!("Rule engine ready");

    let output = execute(&engine, args.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// 执行子命令
fn execute(engine: &RuleEngine, command: Command) -> Result<Value> {
    let output = match command {
        Command::Classify { metric, value } => {
            let metric = parse_metric_key(&metric)?;
            let value = parse_vital_value(&value)?;
            serde_json::to_value(engine.classifier().classify_reading(metric, value)?)?
        }
        Command::BloodPressure { systolic, diastolic } => {
            let systolic = parse_vital_value(&systolic)?;
            let diastolic = parse_vital_value(&diastolic)?;
            serde_json::to_value(engine.classifier().classify_blood_pressure(systolic, diastolic)?)?
        }
        Command::CheckAllergy {
            allergies,
            medication,
            checkpoint,
        } => {
            let allergies: Vec<Allergy> = read_json(&allergies)?;
            let outcome = engine.gate().check(&allergies, &medication, checkpoint.into());
            serde_json::to_value(outcome)?
        }
        Command::Transition { booking, to, actor } => {
            let booking: Booking = read_json(&booking)?;
            let target: BookingStatus = to.parse()?;
            serde_json::to_value(engine.advance_booking(&booking, target, &actor)?)?
        }
        Command::Permitted { status } => {
            let status: BookingStatus = status.parse()?;
            json!({
                "status": status,
                "permitted": engine.state_machine().permitted_transitions(status),
            })
        }
        Command::Timeline { events } => {
            let events: Vec<TimelineEvent> = read_json(&events)?;
            serde_json::to_value(engine.timeline(&events))?
        }
        Command::Ranges { metric: None } => serde_json::to_value(engine.classifier().table().ranges())?,
        Command::Ranges { metric: Some(metric) } => {
            let metric = parse_metric_key(&metric)?;
            serde_json::to_value(engine.classifier().table().require(metric)?)?
        }
    };

    Ok(output)
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}
