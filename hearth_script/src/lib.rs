//! hearth_script: parser and AST for the hearth rule language.
//!
//! A script declares WHEN a trigger fires, optional guarding conditions, and
//! THEN/ELSE/CASE actions that read and write named entities:
//!
//! - `AUTO morning_lights RESTART`
//! - `WHEN 07:00 ON weekday`
//! - `IF person.tom == 'home'`
//! - `THEN TURN ON light AREA kitchen WITH (brightness_pct = 60)`
//! - `END`
//!
//! This crate is the language front end only: it turns source text into the
//! AST defined here, or fails with a [`ParseError`] carrying position and
//! expected-token information. Evaluation, trigger-descriptor compilation,
//! and registration live in the companion engine crate.

mod parser;
pub use parser::{ParseError, parse_automation, parse_file};

use std::fmt;

/// A literal or reference node: the leaves and containers every other
/// construct is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueAst {
    /// Quoted string literal, escapes already decoded.
    Str(String),
    /// Numeric literal, narrowed to `i64` when exact.
    Number(NumberLit),
    /// Reference to an external addressable object (`domain.id[:attribute]`).
    Entity(EntityRef),
    /// Named region grouping entities; expansion happens at resolve time.
    Area(AreaRef),
    /// Reference into scope (`@name[:attribute]`).
    Var(VarRef),
    /// Ordered, possibly heterogeneous sequence.
    List(Vec<ValueAst>),
    /// Ordered key → node mapping with unique keys.
    Dict(DictAst),
}

/// Numeric literal as the narrowest exact type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberLit {
    Int(i64),
    Float(f64),
}
impl NumberLit {
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberLit::Int(n) => *n as f64,
            NumberLit::Float(f) => *f,
        }
    }
}
impl fmt::Display for NumberLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberLit::Int(n) => write!(f, "{n}"),
            NumberLit::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Entity reference. Never holds a live value, only a path.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    pub domain: String,
    pub id: String,
    pub attribute: Option<String>,
}
impl EntityRef {
    /// Full dotted path: `domain.id`, or `domain.id.attribute` when
    /// attribute-qualified.
    pub fn name(&self) -> String {
        match &self.attribute {
            Some(attr) => format!("{}.{}.{}", self.domain, self.id, attr),
            None => format!("{}.{}", self.domain, self.id),
        }
    }
    /// Path with an attribute override applied on top of the reference.
    pub fn name_with(&self, attribute: Option<&str>) -> String {
        match attribute.or(self.attribute.as_deref()) {
            Some(attr) => format!("{}.{}.{}", self.domain, self.id, attr),
            None => format!("{}.{}", self.domain, self.id),
        }
    }
}

/// Area reference by name.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaRef {
    pub name: String,
}

/// Variable reference. The stored name keeps the leading `@`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: String,
    pub attribute: Option<String>,
}

/// Ordered dictionary literal. Keys are plain identifiers and unique;
/// values evaluate lazily.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DictAst {
    pub entries: Vec<(String, ValueAst)>,
}
impl DictAst {
    pub fn get(&self, key: &str) -> Option<&ValueAst> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// What a command acts on: a list of entities/vars, or an AREA-qualified
/// list of areas/vars.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetAst {
    Entities(Vec<ValueAst>),
    Areas(Vec<ValueAst>),
}

/// Binary relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}
impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary relation between two evaluable nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonAst {
    pub left: ValueAst,
    pub op: CompareOp,
    pub right: ValueAst,
}

/// Boolean expression tree. NOT binds tighter than AND, which binds tighter
/// than OR; consecutive same-operator chains fold into one n-ary node. A
/// bare comparison at the root is wrapped as a one-child `All`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionAst {
    Comparison(ComparisonAst),
    Not(Box<ConditionAst>),
    All(Vec<ConditionAst>),
    Any(Vec<ConditionAst>),
}

/// ON/OFF direction for TURN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOff {
    On,
    Off,
}
impl OnOff {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnOff::On => "on",
            OnOff::Off => "off",
        }
    }
}

/// TO (absolute) vs BY (delta) for DIM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimMode {
    To,
    By,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockVerb {
    Lock,
    Unlock,
}
impl LockVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockVerb::Lock => "lock",
            LockVerb::Unlock => "unlock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    Home,
    Away,
    Night,
    Vacation,
}
impl ArmMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmMode::Home => "home",
            ArmMode::Away => "away",
            ArmMode::Night => "night",
            ArmMode::Vacation => "vacation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverVerb {
    Open,
    Close,
}

/// One side-effecting instruction. Dispatch always funnels through the
/// host's `call_service(domain, service, kwargs)`, except SET which writes
/// state directly.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAst {
    Pass,
    Set {
        targets: Vec<ValueAst>,
        value: Box<ValueAst>,
    },
    Wait(DurationAst),
    Turn {
        state: OnOff,
        domain: String,
        target: TargetAst,
        with_data: Option<DictAst>,
    },
    Toggle {
        domain: String,
        target: TargetAst,
    },
    Dim {
        target: TargetAst,
        mode: DimMode,
        amount: Box<ValueAst>,
        percent: bool,
    },
    Lock {
        verb: LockVerb,
        target: TargetAst,
        with_data: Option<DictAst>,
    },
    Arm {
        mode: ArmMode,
        target: TargetAst,
        with_data: Option<DictAst>,
    },
    Disarm {
        target: TargetAst,
        with_data: Option<DictAst>,
    },
    OpenClose {
        verb: CoverVerb,
        target: TargetAst,
        position: Option<NumberLit>,
    },
    Call {
        service: EntityRef,
        target: Option<TargetAst>,
        with_data: Option<DictAst>,
    },
}

/// Which scope map an assignment writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Local,
    Global,
}

/// `@var = value`, tagged with the namespace the containing construct
/// declares (top-of-file → global, in-block → local).
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentAst {
    pub var: VarRef,
    pub value: ValueAst,
    pub namespace: Namespace,
}

/// One executable statement inside a command block.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtAst {
    Command(CommandAst),
    Assignment(AssignmentAst),
    If(IfAst),
    Switch(SwitchAst),
}

/// IF condition THEN-block with an optional ELSE branch (either another IF
/// or a plain block).
#[derive(Debug, Clone, PartialEq)]
pub struct IfAst {
    pub condition: ConditionAst,
    pub then_branch: Vec<StmtAst>,
    pub else_branch: Option<ElseAst>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseAst {
    If(Box<IfAst>),
    Block(Vec<StmtAst>),
}

/// SWITCH with either a leading subject compared by equality against each
/// case's value, or per-case predicate conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchAst {
    pub subject: Option<ValueAst>,
    pub cases: Vec<CaseAst>,
    pub default: Option<Vec<StmtAst>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseAst {
    pub test: CaseTest,
    pub block: Vec<StmtAst>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseTest {
    Condition(ConditionAst),
    Value(ValueAst),
}

/// Wall-clock time of day, seconds defaulting to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAst {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}
impl ClockAst {
    pub fn seconds(&self) -> f64 {
        f64::from(self.hour) * 3600.0 + f64::from(self.minute) * 60.0 + f64::from(self.second)
    }
}
impl fmt::Display for ClockAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Hours,
    Minutes,
    Seconds,
}
impl TimeUnit {
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Hours => 3600.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Seconds => 1.0,
        }
    }
}

/// A duration: a clock time read as an interval, or `N unit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationAst {
    Clock(ClockAst),
    Relative { count: NumberLit, unit: TimeUnit },
}
impl DurationAst {
    pub fn seconds(&self) -> f64 {
        match self {
            DurationAst::Clock(c) => c.seconds(),
            DurationAst::Relative { count, unit } => count.as_f64() * unit.seconds(),
        }
    }
}

/// Day-of-week words, including the WEEKDAY/WEEKEND groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySpec {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
    Weekday,
    Weekend,
}
impl DaySpec {
    /// Scheduler day tokens this word expands to.
    pub fn days(&self) -> &'static [&'static str] {
        match self {
            DaySpec::Mon => &["mon"],
            DaySpec::Tue => &["tue"],
            DaySpec::Wed => &["wed"],
            DaySpec::Thu => &["thu"],
            DaySpec::Fri => &["fri"],
            DaySpec::Sat => &["sat"],
            DaySpec::Sun => &["sun"],
            DaySpec::Weekday => &["mon", "tue", "wed", "thu", "fri"],
            DaySpec::Weekend => &["sat", "sun"],
        }
    }
}

/// One bound of a state-change trigger (`FROM`/`TO [op] value`).
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerBound {
    pub op: CompareOp,
    pub value: ValueAst,
}

/// `entity-list CHANGES [FROM ...] [TO ...] [FOR duration]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChangeAst {
    pub entities: Vec<ValueAst>,
    pub old: Option<TriggerBound>,
    pub new: Option<TriggerBound>,
    pub hold: Option<DurationAst>,
}

/// `time-list [ON day-list]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAst {
    pub times: Vec<ClockAst>,
    pub days: Vec<DaySpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunEventKind {
    Sunrise,
    Sunset,
}
impl SunEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SunEventKind::Sunrise => "sunrise",
            SunEventKind::Sunset => "sunset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetDirection {
    Before,
    After,
}

/// `[N unit BEFORE|AFTER] SUNRISE|SUNSET [ON day-list]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SunAst {
    pub event: SunEventKind,
    pub offset: Option<(DurationAst, OffsetDirection)>,
    pub days: Vec<DaySpec>,
}

/// Trigger variants.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerAst {
    StateChange(StateChangeAst),
    Weekly(WeeklyAst),
    Sun(SunAst),
}

/// One named rule: controls, triggers, and action statements, plus the
/// global assignments that preceded it in source.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationAst {
    pub name: String,
    /// Variable the firing payload is bound to; defaults to `@trigger`.
    pub trigger_var: String,
    /// When set, a re-fire while a run is live cancels the in-flight run.
    pub restart: bool,
    pub globals: Vec<AssignmentAst>,
    pub triggers: Vec<TriggerAst>,
    pub actions: Vec<StmtAst>,
}
