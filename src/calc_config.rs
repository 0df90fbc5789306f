//! Session settings changed through the `)` directives.
//!
//! The store itself does no validation; the `check_*` helpers below hold the
//! allowed domains and are called before anything is mutated, both by the
//! directive dispatcher and when loading a settings file.

use std::fmt;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

/// Largest value accepted by `)prec`.
pub const MAX_FLOAT_PREC: u32 = 1_000_000;
pub const DEFAULT_FLOAT_PREC: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugFlag {
    Panic,
    Parse,
    Tokens,
    Types,
}

/// Every known flag, in the order `)debug` lists them.
pub const DEBUG_FLAGS: [DebugFlag; 4] = [
    DebugFlag::Panic,
    DebugFlag::Parse,
    DebugFlag::Tokens,
    DebugFlag::Types,
];

impl DebugFlag {
    pub fn name(&self) -> &'static str {
        match self {
            DebugFlag::Panic => "panic",
            DebugFlag::Parse => "parse",
            DebugFlag::Tokens => "tokens",
            DebugFlag::Types => "types",
        }
    }

    pub fn from_name(name: &str) -> Option<DebugFlag> {
        DEBUG_FLAGS.iter().copied().find(|f| f.name() == name)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for DebugFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub fn check_base(base: i64) -> Result<u32, String> {
    if base == 0 || (2..=36).contains(&base) {
        Ok(base as u32)
    } else {
        Err(format!("illegal base {}", base))
    }
}

pub fn check_origin(origin: i64) -> Result<u32, String> {
    if origin == 0 || origin == 1 {
        Ok(origin as u32)
    } else {
        Err(format!("illegal origin {}", origin))
    }
}

pub fn check_prec(prec: i64) -> Result<u32, String> {
    if (1..=MAX_FLOAT_PREC as i64).contains(&prec) {
        Ok(prec as u32)
    } else {
        Err(format!("illegal prec {}", prec))
    }
}

/// Initial settings as read from a JSON file; absent keys keep the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub ibase: Option<i64>,
    pub obase: Option<i64>,
    pub origin: Option<i64>,
    pub prec: Option<i64>,
    pub format: Option<String>,
    pub prompt: Option<String>,
    pub seed: Option<i64>,
    pub debug: Vec<String>,
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Settings, serde_json::Error> {
        serde_json::from_str(text)
    }
}

pub struct Config {
    ibase: u32,
    obase: u32,
    origin: u32,
    float_prec: u32,
    format: String,
    prompt: String,
    debug: [bool; DEBUG_FLAGS.len()],
    seed: i64,
    rng: StdRng,
}

impl Default for Config {
    fn default() -> Self {
        Config::with_seed(Utc::now().timestamp_micros())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("ibase", &self.ibase)
            .field("obase", &self.obase)
            .field("origin", &self.origin)
            .field("float_prec", &self.float_prec)
            .field("format", &self.format)
            .field("prompt", &self.prompt)
            .field("debug", &self.debug)
            .field("seed", &self.seed)
            .finish()
    }
}

impl Config {
    pub fn with_seed(seed: i64) -> Self {
        Config {
            ibase: 0,
            obase: 0,
            origin: 1,
            float_prec: DEFAULT_FLOAT_PREC,
            format: String::new(),
            prompt: String::new(),
            debug: [false; DEBUG_FLAGS.len()],
            seed,
            rng: StdRng::seed_from_u64(seed as u64),
        }
    }

    /// Checks every value in `settings` first, then applies them all.
    pub fn apply_settings(&mut self, settings: &Settings) -> Result<(), String> {
        let ibase = settings.ibase.map(check_base).transpose()?;
        let obase = settings.obase.map(check_base).transpose()?;
        let origin = settings.origin.map(check_origin).transpose()?;
        let prec = settings.prec.map(check_prec).transpose()?;
        let mut flags = Vec::new();
        for name in &settings.debug {
            match DebugFlag::from_name(name) {
                Some(flag) => flags.push(flag),
                None => return Err(format!("no such debug flag: {}", name)),
            }
        }

        let (cur_ibase, cur_obase) = self.base();
        self.set_base(ibase.unwrap_or(cur_ibase), obase.unwrap_or(cur_obase));
        if let Some(origin) = origin {
            self.set_origin(origin);
        }
        if let Some(prec) = prec {
            self.set_float_prec(prec);
        }
        if let Some(format) = &settings.format {
            self.set_format(format);
        }
        if let Some(prompt) = &settings.prompt {
            self.set_prompt(prompt);
        }
        if let Some(seed) = settings.seed {
            self.set_seed(seed);
        }
        for flag in flags {
            self.set_debug(flag, true);
        }
        Ok(())
    }

    pub fn base(&self) -> (u32, u32) {
        (self.ibase, self.obase)
    }

    pub fn set_base(&mut self, ibase: u32, obase: u32) {
        self.ibase = ibase;
        self.obase = obase;
    }

    pub fn origin(&self) -> u32 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: u32) {
        self.origin = origin;
    }

    pub fn float_prec(&self) -> u32 {
        self.float_prec
    }

    pub fn set_float_prec(&mut self, prec: u32) {
        self.float_prec = prec;
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn set_format(&mut self, format: &str) {
        self.format = format.to_string();
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }

    pub fn debug(&self, flag: DebugFlag) -> bool {
        self.debug[flag.index()]
    }

    pub fn set_debug(&mut self, flag: DebugFlag, value: bool) {
        self.debug[flag.index()] = value;
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Stores the seed and restarts the random generator from it.
    pub fn set_seed(&mut self, seed: i64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed as u64);
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
