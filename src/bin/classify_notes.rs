use notecat::models::EvaluationReport;
use notecat::services::classification::CategoryEvaluator;
use notecat::services::providers::{parse_provider, ProviderClient, ProviderSpec};
use notecat::services::question_bank::QuestionBank;
use notecat::services::sentence_segmenter::SegmenterClient;
use notecat::services::text_processor::normalize_note;
use notecat::services::ConfigStore;
use serde::Serialize;
use std::sync::Arc;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_arg_values(args: &[String], key: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == key {
            if let Some(v) = args.get(i + 1) {
                values.push(v.clone());
                i += 1;
            }
        }
        i += 1;
    }
    values
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

/// Split a note into independently evaluated text blocks (blank-line
/// separated); a note without blank lines is a single block.
fn note_units(text: &str) -> Vec<String> {
    let units: Vec<String> = text
        .split("\n\n")
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .map(|b| b.to_string())
        .collect();

    if units.is_empty() {
        vec![text.trim().to_string()]
    } else {
        units
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    notecat::init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  classify_notes <note.txt> --questions <Questions.csv> \
[--category <name>]... [--provider <name[:model]>] [--segmenter-url <url>] \
[--token-length <n>] [--min-token-length <n>] [--out <json_path>]\n\n\
Notes:\n  - Without --category, every category in the question table is evaluated.\n\
  - The default provider is a local TGI endpoint (NOTECAT_TGI_URL)."
        );
        return Ok(());
    }

    let note_path = args[1].clone();
    let config = ConfigStore::default_config_dir()
        .map(ConfigStore::new)
        .and_then(|store| store.load().ok())
        .unwrap_or_default();

    let questions_path = parse_arg_value(&args, "--questions")
        .or(config.question_table.clone())
        .ok_or_else(|| "no question table: pass --questions or set it in config".to_string())?;

    let provider = parse_arg_value(&args, "--provider")
        .or(config.default_provider.clone())
        .map(|p| parse_provider(&p))
        .unwrap_or(ProviderSpec {
            name: "tgi".to_string(),
            model: String::new(),
        });

    let segmenter_url = parse_arg_value(&args, "--segmenter-url").or(config.segmenter_url.clone());

    let mut opts = config.evaluation.clone();
    if let Some(n) = parse_arg_value(&args, "--token-length").and_then(|s| s.parse().ok()) {
        opts.token_length = n;
    }
    if let Some(n) = parse_arg_value(&args, "--min-token-length").and_then(|s| s.parse().ok()) {
        opts.min_token_length = n;
    }
    let out_path = parse_arg_value(&args, "--out");

    let raw = std::fs::read_to_string(&note_path).map_err(|e| format!("read note failed: {}", e))?;
    let text = normalize_note(&raw);
    let units = note_units(&text);

    let bank = Arc::new(QuestionBank::from_csv_path(&questions_path).map_err(|e| e.to_string())?);

    let mut categories = parse_arg_values(&args, "--category");
    if categories.is_empty() {
        categories = bank.categories().map(|c| c.to_string()).collect();
        categories.sort();
    }

    println!("Note: {}", note_path);
    println!("Units: {}", units.len());
    println!("Categories: {}", categories.len());
    println!("Provider: {}", provider.name);
    println!(
        "Token window: {} (min {})",
        opts.token_length, opts.min_token_length
    );
    println!();

    let segmenter = match segmenter_url.as_deref() {
        Some(url) => SegmenterClient::new(url, "en"),
        None => SegmenterClient::default(),
    };
    let generator = ProviderClient::new(provider);
    let evaluator = CategoryEvaluator::new(bank, segmenter, generator, opts);

    let mut reports: Vec<EvaluationReport> = Vec::with_capacity(categories.len());
    for category in &categories {
        let report = evaluator
            .evaluate(&units, category)
            .await
            .map_err(|e| e.to_string())?;

        let answers: Vec<u8> = report.verdicts.iter().map(|v| v.as_u8()).collect();
        let skipped: usize = report.units.iter().map(|u| u.skips.len()).sum();
        println!(
            "[{}] answers={:?} skippedFragments={} unparseable={}",
            category,
            answers,
            skipped,
            report.unparseable_total()
        );
        reports.push(report);
    }

    println!();
    for (i, unit) in units.iter().enumerate() {
        println!("[U{:03}] {}", i, preview(unit, 100));
    }

    if let Some(out_path) = out_path {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output {
            note: String,
            units: usize,
            reports: Vec<EvaluationReport>,
        }

        let out = Output {
            note: note_path.clone(),
            units: units.len(),
            reports,
        };

        let json = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
        std::fs::write(&out_path, json).map_err(|e| format!("write out failed: {}", e))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
