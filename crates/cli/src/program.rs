//! The run pipeline.
//!
//! A run is a fixed sequence of steps, each contributing one compiled piece
//! of state; any step failure aborts with its step name attached. Execution
//! walks the targets from this thread and feeds file paths to worker
//! threads over a rendezvous channel.

use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::{
    self,
    termcolor::{ColorChoice, StandardStream},
};
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info};

use phpgrep_core::error::{ParseError, PatternError};
use phpgrep_core::pattern::{pattern_source, CompileOption};
use phpgrep_core::rewrite::{apply_edits, TextEdit};
use phpgrep_core::{Compiler, Filter, Matcher};

use crate::absolute_path;
use crate::cli::Opts;
use crate::format::{colorize, uncolorize, FormatDeps, OutputFormat};
use crate::worker::{FileMatch, Worker};

const MAX_LIMIT: u64 = 100_000;
const MAX_WORKERS: usize = 128;

pub fn run(mut opts: Opts) -> Result<bool> {
    if opts.verbose {
        opts.progress = "append".to_string();
    }
    debug!("targets: {}", opts.targets);
    debug!("pattern: {}", opts.pattern);
    debug!("filters: {:?}", opts.filters);

    let mut program = Program::new(opts);
    macro_rules! step {
        ($name:literal, $call:expr) => {{
            debug!(concat!("starting \"", $name, "\" step"));
            $call.context($name)?;
        }};
    }
    step!("validate flags", program.validate_flags());
    step!("compile filters", program.compile_filters());
    step!("compile exclude results", program.compile_exclude_results());
    step!("compile exclude pattern", program.compile_exclude_pattern());
    step!("compile pattern", program.compile_pattern());
    step!("compile output format", program.compile_output_format());
    step!("execute pattern", program.execute());
    step!("print matches", program.print_matches());
    step!("replace matches", program.replace_matches());

    Ok(program.matches.load(Ordering::SeqCst) > 0)
}

struct Program {
    opts: Opts,
    worker_count: usize,
    limit: u64,
    extensions: Vec<String>,
    filters: Vec<Filter>,
    exclude: Option<Regex>,
    exclude_results: Arc<FxHashMap<String, Vec<u32>>>,
    matcher: Option<Matcher>,
    format: Option<OutputFormat>,
    deps: FormatDeps,
    finished: Vec<Worker>,
    matches: Arc<AtomicU64>,
}

impl Program {
    fn new(opts: Opts) -> Self {
        Self {
            opts,
            worker_count: 1,
            limit: 0,
            extensions: Vec::new(),
            filters: Vec::new(),
            exclude: None,
            exclude_results: Arc::new(FxHashMap::default()),
            matcher: None,
            format: None,
            deps: FormatDeps::default(),
            finished: Vec::new(),
            matches: Arc::new(AtomicU64::new(0)),
        }
    }

    fn validate_flags(&mut self) -> Result<()> {
        self.worker_count = match self.opts.workers {
            None => thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            Some(0) => bail!("workers value can't be less than 1"),
            Some(n) => n,
        };
        // users won't notice
        self.worker_count = self.worker_count.min(MAX_WORKERS);
        if self.opts.targets.is_empty() {
            bail!("target can't be empty");
        }
        if self.opts.pattern.is_empty() {
            bail!("pattern can't be empty");
        }
        if self.opts.format.is_empty() {
            bail!("format can't be empty");
        }
        colorize("", &self.opts.color_filename).map_err(|err| anyhow!("color-filename: {err}"))?;
        colorize("", &self.opts.color_line).map_err(|err| anyhow!("color-line: {err}"))?;
        colorize("", &self.opts.color_match).map_err(|err| anyhow!("color-match: {err}"))?;
        match self.opts.progress.as_str() {
            "none" | "append" | "update" => {}
            other => bail!("progress: unexpected mode {other:?}"),
        }
        // if there are more than 100k results, something is wrong; most
        // likely the pattern is too generic and needs adjustment
        self.limit = self.opts.limit;
        if self.limit == 0 || self.limit > MAX_LIMIT {
            self.limit = MAX_LIMIT;
        }
        self.extensions = self
            .opts
            .php_ext
            .split(',')
            .map(|ext| format!(".{}", ext.trim()))
            .filter(|ext| ext.len() > 1)
            .collect();
        if self.extensions.is_empty() {
            bail!("php-ext can't be empty");
        }
        Ok(())
    }

    fn compile_filters(&mut self) -> Result<()> {
        for s in &self.opts.filters {
            let filter = Filter::parse(s).with_context(|| format!("compile {s:?} filter"))?;
            self.filters.push(filter);
        }
        Ok(())
    }

    fn compile_exclude_results(&mut self) -> Result<()> {
        let Some(path) = &self.opts.exclude_results else {
            return Ok(());
        };
        let data = fs::read_to_string(path).context("can't read exclude-results file")?;
        let mut map: FxHashMap<String, Vec<u32>> = FxHashMap::default();
        for line in data.lines() {
            if line.is_empty() {
                continue;
            }
            let line = uncolorize(line);
            let mut parts = line.split(':');
            let (Some(filename), Some(line_no)) = (parts.next(), parts.next()) else {
                bail!("unsupported exclude-results file contents");
            };
            let line_no: u32 = line_no
                .parse()
                .map_err(|err| anyhow!("unsupported exclude-results file contents: {err}"))?;
            map.entry(filename.to_string()).or_default().push(line_no);
        }
        self.exclude_results = Arc::new(map);
        Ok(())
    }

    fn compile_exclude_pattern(&mut self) -> Result<()> {
        if let Some(pattern) = &self.opts.exclude {
            self.exclude = Some(Regex::new(pattern).context("invalid exclude regexp")?);
        }
        Ok(())
    }

    fn compile_pattern(&mut self) -> Result<()> {
        let option = CompileOption {
            case_sensitive: self.opts.case_sensitive,
            fuzzy_matching: !self.opts.strict_syntax,
        };
        let filters = std::mem::take(&mut self.filters);
        match Compiler::new(option).compile(&self.opts.pattern, filters) {
            Ok(matcher) => {
                self.matcher = Some(matcher);
                Ok(())
            }
            Err(PatternError::Syntax(parse_err)) => {
                report_pattern_diagnostic(&self.opts.pattern, &parse_err);
                Err(anyhow!(PatternError::Syntax(parse_err)))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn compile_output_format(&mut self) -> Result<()> {
        let format = OutputFormat::parse(&self.opts.format)?;
        self.deps = format.deps();
        self.format = Some(format);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let matcher = self.matcher.clone().expect("pattern compiled");
        let (tx, rx) = mpsc::sync_channel::<PathBuf>(0);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers: Vec<Worker> = (0..self.worker_count)
            .map(|id| Worker {
                id,
                matcher: matcher.clone(),
                need_match_data: self.deps.capture,
                need_match_line: self.deps.match_line,
                exclude_results: Arc::clone(&self.exclude_results),
                matches: Vec::new(),
                errors: Vec::new(),
            })
            .collect();

        let finished = thread::scope(|scope| -> Result<Vec<Worker>> {
            let mut handles = Vec::new();
            for mut worker in workers.drain(..) {
                let rx = Arc::clone(&rx);
                let total = Arc::clone(&self.matches);
                handles.push(scope.spawn(move || {
                    loop {
                        let next = rx.lock().expect("filename queue lock").recv();
                        let Ok(path) = next else { break };
                        debug!("worker#{} greps {:?} file", worker.id, path);
                        match worker.grep_file(&path) {
                            Ok(0) => {}
                            Ok(n) => {
                                total.fetch_add(n as u64, Ordering::SeqCst);
                            }
                            Err(msg) => worker.errors.push(format!(
                                "execute pattern: {}: {msg}",
                                path.display()
                            )),
                        }
                    }
                    worker
                }));
            }

            let walk_result = self.walk_targets(&tx);
            drop(tx);
            let mut finished = Vec::new();
            for handle in handles {
                finished.push(handle.join().expect("worker thread panicked"));
            }
            walk_result?;
            Ok(finished)
        })?;

        if self.opts.progress == "update" {
            eprintln!();
        }
        for worker in &finished {
            for err in &worker.errors {
                error!("{err}");
            }
        }
        self.finished = finished;
        Ok(())
    }

    fn walk_targets(&self, tx: &mpsc::SyncSender<PathBuf>) -> Result<()> {
        let mut progress = Progress {
            mode: self.opts.progress.clone(),
            files: 0,
            last: Instant::now(),
        };
        for target in self.opts.targets.split(',') {
            let target = target.trim();
            if target.is_empty() {
                continue;
            }
            if let ControlFlow::Break(()) =
                self.walk_path(Path::new(target), tx, &mut progress)?
            {
                break;
            }
        }
        Ok(())
    }

    fn walk_path(
        &self,
        path: &Path,
        tx: &mpsc::SyncSender<PathBuf>,
        progress: &mut Progress,
    ) -> Result<ControlFlow<()>> {
        if self.matches.load(Ordering::SeqCst) > self.limit {
            return Ok(ControlFlow::Break(()));
        }
        if let Some(exclude) = &self.exclude {
            let abs = absolute_path(path)
                .with_context(|| format!("abs({})", path.display()))?;
            if exclude.is_match(&abs.to_string_lossy()) {
                return Ok(ControlFlow::Continue(()));
            }
        }
        let meta = fs::metadata(path).with_context(|| path.display().to_string())?;
        if meta.is_dir() {
            let mut entries = fs::read_dir(path)
                .and_then(|it| it.collect::<io::Result<Vec<_>>>())
                .with_context(|| path.display().to_string())?;
            entries.sort_by_key(|entry| entry.file_name());
            for entry in entries {
                if let ControlFlow::Break(()) = self.walk_path(&entry.path(), tx, progress)? {
                    return Ok(ControlFlow::Break(()));
                }
            }
            return Ok(ControlFlow::Continue(()));
        }
        if !self.is_php_file(path) {
            return Ok(ControlFlow::Continue(()));
        }
        if tx.send(path.to_path_buf()).is_err() {
            return Ok(ControlFlow::Break(()));
        }
        progress.tick(self.matches.load(Ordering::SeqCst));
        Ok(ControlFlow::Continue(()))
    }

    fn is_php_file(&self, path: &Path) -> bool {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        self.extensions.iter().any(|ext| name.ends_with(ext))
    }

    fn print_matches(&self) -> Result<()> {
        if self.opts.replace {
            return Ok(());
        }
        let mut printed: u64 = 0;
        for worker in &self.finished {
            for m in &worker.matches {
                let line =
                    self.render_match(m, !self.opts.no_color, self.opts.multiline, self.opts.abs)?;
                println!("{line}");
                printed += 1;
                if printed >= self.limit {
                    info!("results limited to {} matches", self.limit);
                    return Ok(());
                }
            }
        }
        info!("found {printed} matches");
        Ok(())
    }

    fn replace_matches(&self) -> Result<()> {
        if !self.opts.replace {
            return Ok(());
        }
        let mut edits_by_file: FxHashMap<String, Vec<TextEdit>> = FxHashMap::default();
        let mut replaced: u64 = 0;
        'collect: for worker in &self.finished {
            for m in &worker.matches {
                let replacement = self.render_match(m, false, true, false)?;
                edits_by_file
                    .entry(m.filename.clone())
                    .or_default()
                    .push(TextEdit {
                        start: m.start,
                        end: m.end,
                        replacement,
                    });
                replaced += 1;
                if replaced >= self.limit {
                    info!("too many matches ({}), increase the --limit argument", self.limit);
                    break 'collect;
                }
            }
        }
        for (filename, mut edits) in edits_by_file {
            let contents =
                fs::read_to_string(&filename).with_context(|| format!("read {filename}"))?;
            let rewritten =
                apply_edits(&contents, &mut edits).with_context(|| format!("edit {filename}"))?;
            fs::write(&filename, rewritten).with_context(|| format!("write {filename}"))?;
        }
        info!("replaced {replaced} matches");
        Ok(())
    }

    fn render_match(
        &self,
        m: &FileMatch,
        colors: bool,
        multiline: bool,
        abs: bool,
    ) -> Result<String> {
        let format = self.format.as_ref().expect("output format compiled");
        let filename = if abs {
            absolute_path(&m.filename)
                .with_context(|| format!("abs({:?})", m.filename))?
                .display()
                .to_string()
        } else {
            m.filename.clone()
        };
        let line = m.line.to_string();
        let match_text = m.match_text().to_string();
        let match_line = m.text.clone();

        let (filename, line, match_text, match_line) = if colors {
            let colored_match = colorize(&match_text, &self.opts.color_match)?;
            let match_line = format!(
                "{}{}{}",
                &m.text[..m.match_start],
                colored_match,
                &m.text[m.match_start + m.match_len..]
            );
            (
                colorize(&filename, &self.opts.color_filename)?,
                colorize(&line, &self.opts.color_line)?,
                colored_match,
                match_line,
            )
        } else {
            (filename, line, match_text, match_line)
        };

        let escape = |s: &str| {
            if multiline {
                s.to_string()
            } else {
                s.replace('\n', "\\n")
            }
        };
        let match_text = escape(&match_text);
        let match_line = escape(&match_line);

        Ok(format.render(|name| match name {
            "Filename" => filename.clone(),
            "Line" => line.clone(),
            "Match" => match_text.clone(),
            "MatchLine" => match_line.clone(),
            other => m
                .captures
                .iter()
                .find(|(n, _)| n == other)
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
        }))
    }
}

struct Progress {
    mode: String,
    files: u64,
    last: Instant,
}

impl Progress {
    fn tick(&mut self, matches: u64) {
        self.files += 1;
        if self.last.elapsed() < Duration::from_secs(1) {
            return;
        }
        match self.mode.as_str() {
            "append" => eprintln!("{matches} matches so far, processed {} files", self.files),
            "update" => eprint!("\r{matches} matches so far, processed {} files", self.files),
            _ => {}
        }
        self.last = Instant::now();
    }
}

/// Pattern syntax errors get a span-annotated rendering of the augmented
/// pattern source, on top of the one-line fatal diagnostic.
fn report_pattern_diagnostic(pattern: &str, err: &ParseError) {
    let source = pattern_source(pattern);
    let mut files = SimpleFiles::new();
    let file = files.add("pattern", &source);
    let start = err.location.start.offset.min(source.len());
    let mut end = err.location.end.offset.min(source.len());
    if end <= start {
        end = (start + 1).min(source.len());
    }
    let diagnostic = Diagnostic::error()
        .with_message(err.to_string())
        .with_labels(vec![Label::primary(file, start..end)]);
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();
    let _ = term::emit(&mut writer.lock(), &config, &files, &diagnostic);
}
