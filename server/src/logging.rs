use crate::Config as ServerConfig;
use flate2::{write::GzEncoder, Compression};
use log::*;
use log4rs::{
    append::{
        rolling_file::{
            policy::compound::{roll::Roll, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
        Append,
    },
    config::{Appender, Config as Log4rsConfig, Root},
    encode::{self, Encode},
    filter::{Filter, Response},
};
use once_cell::sync::{Lazy, OnceCell};
use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
    fs::{read_dir, remove_file, rename, File},
    io,
    io::{stdout, Write},
    path::{Component, Path, PathBuf},
    sync::Mutex,
    thread,
};
use termion::color;
use time::{
    format_description::{self, FormatItem},
    OffsetDateTime,
    UtcOffset,
};

pub static TIME_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse("[hour repr:24]:[minute]:[second].[subsecond digits:3]")
        .expect("Invalid time format description")
});

pub static DATE_FORMAT: Lazy<Vec<FormatItem<'static>>> =
    Lazy::new(|| format_description::parse("[year]-[month]-[day]").expect("Invalid date format"));

/// Both binaries log into the same directory, so files are prefixed with the binary name.
static LOG_NAME: OnceCell<&'static str> = OnceCell::new();

const FILE_SIZE_LIMIT: u64 = 50_000_000;

/// Crates whose records are kept in debug builds.
const WORKSPACE_CRATES: [&str; 4] = ["common", "io", "peer", "server"];

#[cfg(debug_assertions)]
const LEVEL_FILTER: LevelFilter = LevelFilter::Debug;
#[cfg(not(debug_assertions))]
const LEVEL_FILTER: LevelFilter = LevelFilter::Info;

macro_rules! format_record {
    ($writer:expr, $record:expr) => {{
        let writer = $writer;
        let record = $record;
        let location = Location::from_record(record);

        writeln!(
            writer,
            "[{} {} {}{}{}]: {}",
            format_time(current_time()),
            thread::current().name().unwrap_or("?"),
            record.metadata().level(),
            if matches!(location, Location::Some { .. }) {
                " "
            } else {
                ""
            },
            location,
            record.args()
        )
    }};
}

/// Logs to the console in colour and to `<log dir>/<name>-latest.log`, which is rolled into
/// gzipped `<name>-<date>-<n>.log.gz` files.
pub fn init_logger(name: &'static str) -> Result<(), anyhow::Error> {
    let _ = LOG_NAME.set(name);

    let log_file = RollingFileAppender::builder()
        .encoder(Box::new(LogEncoder))
        .build(
            latest_log_path(),
            Box::new(CompoundPolicy::new(
                Box::new(SizeTrigger::new(FILE_SIZE_LIMIT)),
                Box::new(GzipRoller::new()),
            )),
        )?;

    let config = Log4rsConfig::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(WorkspaceFilter))
                .build("console", Box::new(ConsoleAppender)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(WorkspaceFilter))
                .build("log_file", Box::new(log_file)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("log_file")
                .build(LEVEL_FILTER),
        )?;

    log4rs::init_config(config)?;

    Ok(())
}

/// Compresses the latest log file. Called last thing in `main`.
pub fn cleanup() {
    let _ = GzipRoller::new().roll_threaded(&latest_log_path(), false);
}

fn log_name() -> &'static str {
    LOG_NAME.get().copied().unwrap_or("cops")
}

fn latest_log_path() -> PathBuf {
    ServerConfig::get()
        .log_dir
        .join(format!("{}-latest.log", log_name()))
}

fn current_time() -> OffsetDateTime {
    try_localize(OffsetDateTime::now_utc())
}

pub fn try_localize(datetime: OffsetDateTime) -> OffsetDateTime {
    match ServerConfig::get().utc_offset {
        Some(offset) => datetime.to_offset(offset),
        None => match UtcOffset::local_offset_at(datetime) {
            Ok(offset) => datetime.to_offset(offset),
            Err(_) => datetime,
        },
    }
}

fn format_time(datetime: OffsetDateTime) -> String {
    match datetime.format(&*TIME_FORMAT) {
        Ok(formatted) => formatted,
        Err(_) => "??:??:??.???".to_owned(),
    }
}

// Dependencies are noisy at debug level
#[derive(Debug, Clone, Copy)]
struct WorkspaceFilter;

impl Filter for WorkspaceFilter {
    #[cfg(debug_assertions)]
    fn filter(&self, record: &Record<'_>) -> Response {
        let module = record.module_path().unwrap_or_default();
        let crate_name = module.split("::").next().unwrap_or_default();
        if WORKSPACE_CRATES.contains(&crate_name) || crate_name == "policy_server" {
            Response::Accept
        } else {
            Response::Reject
        }
    }

    #[cfg(not(debug_assertions))]
    fn filter(&self, _record: &Record) -> Response {
        Response::Neutral
    }
}

#[derive(Debug)]
struct ConsoleAppender;

impl Append for ConsoleAppender {
    fn append(&self, record: &Record<'_>) -> Result<(), anyhow::Error> {
        let mut writer = stdout().lock();
        match record.metadata().level() {
            Level::Error => write!(writer, "{}", color::Fg(color::Red))?,
            Level::Warn => write!(writer, "{}", color::Fg(color::LightYellow))?,
            Level::Debug | Level::Trace => write!(writer, "{}", color::Fg(color::LightCyan))?,
            Level::Info => write!(writer, "{}", color::Fg(color::Reset))?,
        }
        format_record!(&mut writer, record)?;
        write!(writer, "{}", color::Fg(color::Reset))?;
        Ok(())
    }

    fn flush(&self) {}
}

#[derive(Debug, Clone, Copy)]
struct RollState {
    day: u16,
    count: u32,
}

#[derive(Debug)]
struct GzipRoller {
    state: Mutex<RollState>,
}

impl GzipRoller {
    fn new() -> Self {
        let prefix = format!(
            "{}-{}",
            log_name(),
            current_time().format(&*DATE_FORMAT).unwrap_or_default()
        );

        // Continue numbering after today's highest <name>-<date>-<n>.log.gz
        let count = read_dir(&ServerConfig::get().log_dir)
            .map(|entries| {
                entries
                    .flatten()
                    .flat_map(|entry| entry.file_name().into_string())
                    .filter(|name| name.starts_with(&prefix))
                    .filter_map(|name| Self::index_from_name(&name))
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        Self {
            state: Mutex::new(RollState {
                day: current_time().ordinal(),
                count,
            }),
        }
    }

    fn index_from_name(name: &str) -> Option<u32> {
        let dash = name.rfind('-')?;
        let dot = name.find('.')?;
        name.get(dash.saturating_add(1) .. dot)
            .and_then(|index| index.parse::<u32>().ok())
    }

    fn roll_threaded(&self, file: &Path, threaded: bool) -> Result<(), anyhow::Error> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("log roller mutex poisoned"))?;

        let now = current_time();
        if now.ordinal() != state.day {
            state.day = now.ordinal();
            state.count = 1;
        } else {
            state.count = state.count.saturating_add(1);
        }

        let log_dir = &ServerConfig::get().log_dir;

        // Move the file out of the way first, compressing a large log takes a while
        let pending = log_dir.join(format!("{}-rolling.log", log_name()));
        rename(file, &pending)?;

        let output = log_dir.join(format!(
            "{}-{}-{}.log.gz",
            log_name(),
            now.format(&*DATE_FORMAT)?,
            state.count
        ));
        drop(state);

        if threaded {
            thread::spawn(move || Self::try_compress_log(&pending, &output));
        } else {
            Self::try_compress_log(&pending, &output);
        }

        Ok(())
    }

    fn try_compress_log(input_path: &Path, output_path: &Path) {
        if let Err(error) = Self::compress_log(input_path, output_path) {
            error!("Failed to compress log file: {}", error);
        }
    }

    fn compress_log(input_path: &Path, output_path: &Path) -> Result<(), io::Error> {
        let mut input = File::open(input_path)?;
        let mut output = GzEncoder::new(File::create(output_path)?, Compression::default());
        io::copy(&mut input, &mut output)?;
        drop(output.finish()?);
        // Some platforms refuse to remove a file that is still open
        drop(input);
        remove_file(input_path)
    }
}

impl Roll for GzipRoller {
    fn roll(&self, file: &Path) -> Result<(), anyhow::Error> {
        self.roll_threaded(file, true)
    }
}

#[derive(Debug)]
struct LogEncoder;

impl Encode for LogEncoder {
    fn encode(&self, writer: &mut dyn encode::Write, record: &Record<'_>) -> anyhow::Result<()> {
        format_record!(writer, record).map_err(Into::into)
    }
}

enum Location<'a> {
    None,
    Some { file: Cow<'a, str>, line: u32 },
}

impl<'a> Location<'a> {
    /// Only debug and error records carry a source location, relative to the crate's `src`.
    fn from_record(record: &Record<'a>) -> Self {
        let (file, line) = match record.level() {
            Level::Info | Level::Warn => return Self::None,
            _ => match (record.file(), record.line()) {
                (Some(file), Some(line)) => (file, line),
                _ => return Self::None,
            },
        };

        let truncated = Path::new(file)
            .components()
            .skip_while(|component| component != &Component::Normal("src".as_ref()))
            .skip(1)
            .collect::<PathBuf>();
        if truncated.as_os_str().is_empty() {
            return Self::Some {
                file: Cow::Borrowed(file),
                line,
            };
        }

        match truncated.into_os_string().into_string() {
            Ok(string) => Self::Some {
                file: Cow::Owned(string),
                line,
            },
            Err(_) => Self::Some {
                file: Cow::Borrowed(file),
                line,
            },
        }
    }
}

impl<'a> Display for Location<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Some { file, line } => write!(f, "{}:{}", file, line),
        }
    }
}
