//! Builders for trigger clauses and the time vocabulary.

use pest::iterators::Pair;

use crate::{
    ClockAst, CompareOp, DaySpec, DurationAst, OffsetDirection, StateChangeAst, SunAst,
    SunEventKind, TimeUnit, TriggerAst, TriggerBound, ValueAst, WeeklyAst,
};

use super::conditions::parse_compare_op;
use super::helpers::parse_number;
use super::values::{parse_entity, parse_entity_list, parse_string_lit};
use super::{ParseError, Rule};

pub(super) fn parse_trigger_pair(pair: Pair<Rule>) -> Result<TriggerAst, ParseError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty trigger"))?;
    match inner.as_rule() {
        Rule::state_trigger => parse_state_trigger(inner),
        Rule::sun_trigger => parse_sun_trigger(inner),
        Rule::time_trigger => parse_time_trigger(inner),
        _ => Err(ParseError::Shape("unknown trigger kind")),
    }
}

fn parse_state_trigger(pair: Pair<Rule>) -> Result<TriggerAst, ParseError> {
    let mut entities = None;
    let mut old = None;
    let mut new = None;
    let mut hold = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::entity_list => entities = Some(parse_entity_list(p)?),
            Rule::from_clause => old = Some(parse_bound(p)?),
            Rule::to_clause => new = Some(parse_bound(p)?),
            Rule::hold_clause => {
                let d = p
                    .into_inner()
                    .find(|q| q.as_rule() == Rule::duration)
                    .ok_or(ParseError::Shape("FOR missing duration"))?;
                hold = Some(parse_duration(d)?);
            },
            Rule::kw_changes => {},
            _ => return Err(ParseError::Shape("unexpected state trigger shape")),
        }
    }
    Ok(TriggerAst::StateChange(StateChangeAst {
        entities: entities.ok_or(ParseError::Shape("state trigger missing entities"))?,
        old,
        new,
        hold,
    }))
}

fn parse_bound(pair: Pair<Rule>) -> Result<TriggerBound, ParseError> {
    let mut op = CompareOp::Eq;
    let mut value = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::compare_op => op = parse_compare_op(p.as_str())?,
            Rule::trigger_value => {
                let inner = p
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("empty trigger bound"))?;
                value = Some(match inner.as_rule() {
                    Rule::string => ValueAst::Str(parse_string_lit(inner)?),
                    Rule::number => ValueAst::Number(parse_number(inner.as_str())?),
                    Rule::entity => ValueAst::Entity(parse_entity(inner)?),
                    _ => return Err(ParseError::Shape("unexpected trigger bound value")),
                });
            },
            Rule::kw_from | Rule::kw_to => {},
            _ => return Err(ParseError::Shape("unexpected trigger bound shape")),
        }
    }
    Ok(TriggerBound {
        op,
        value: value.ok_or(ParseError::Shape("trigger bound missing value"))?,
    })
}

fn parse_sun_trigger(pair: Pair<Rule>) -> Result<TriggerAst, ParseError> {
    let mut event = None;
    let mut offset = None;
    let mut days = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::sun_offset => {
                let mut duration = None;
                let mut direction = None;
                for q in p.into_inner() {
                    match q.as_rule() {
                        Rule::relative_time => duration = Some(parse_relative(q)?),
                        Rule::kw_before => direction = Some(OffsetDirection::Before),
                        Rule::kw_after => direction = Some(OffsetDirection::After),
                        _ => return Err(ParseError::Shape("unexpected sun offset shape")),
                    }
                }
                offset = Some((
                    duration.ok_or(ParseError::Shape("sun offset missing duration"))?,
                    direction.ok_or(ParseError::Shape("sun offset missing BEFORE/AFTER"))?,
                ));
            },
            Rule::sun_event => {
                let kw = p
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("empty sun event"))?;
                event = Some(match kw.as_rule() {
                    Rule::kw_sunrise => SunEventKind::Sunrise,
                    Rule::kw_sunset => SunEventKind::Sunset,
                    _ => return Err(ParseError::Shape("unknown sun event")),
                });
            },
            Rule::day_list => days = parse_day_list(p)?,
            Rule::kw_on => {},
            _ => return Err(ParseError::Shape("unexpected sun trigger shape")),
        }
    }
    Ok(TriggerAst::Sun(SunAst {
        event: event.ok_or(ParseError::Shape("sun trigger missing event"))?,
        offset,
        days,
    }))
}

fn parse_time_trigger(pair: Pair<Rule>) -> Result<TriggerAst, ParseError> {
    let mut times = Vec::new();
    let mut days = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::clock_list => {
                for c in p.into_inner().filter(|q| q.as_rule() == Rule::clock) {
                    times.push(parse_clock(c)?);
                }
            },
            Rule::day_list => days = parse_day_list(p)?,
            Rule::kw_on => {},
            _ => return Err(ParseError::Shape("unexpected time trigger shape")),
        }
    }
    if times.is_empty() {
        return Err(ParseError::Shape("time trigger missing times"));
    }
    Ok(TriggerAst::Weekly(WeeklyAst { times, days }))
}

pub(super) fn parse_clock(pair: Pair<Rule>) -> Result<ClockAst, ParseError> {
    let mut parts = pair.into_inner().filter(|p| p.as_rule() == Rule::two_digits);
    let hour: u8 = parts
        .next()
        .ok_or(ParseError::Shape("clock missing hour"))?
        .as_str()
        .parse()
        .map_err(|_| ParseError::Shape("invalid clock hour"))?;
    let minute: u8 = parts
        .next()
        .ok_or(ParseError::Shape("clock missing minute"))?
        .as_str()
        .parse()
        .map_err(|_| ParseError::Shape("invalid clock minute"))?;
    let second: u8 = match parts.next() {
        Some(p) => p
            .as_str()
            .parse()
            .map_err(|_| ParseError::Shape("invalid clock second"))?,
        None => 0,
    };
    if hour > 23 || minute > 59 || second > 59 {
        return Err(ParseError::ShapeAt {
            msg: "clock time out of range",
            context: format!("{hour:02}:{minute:02}:{second:02}"),
        });
    }
    Ok(ClockAst { hour, minute, second })
}

fn parse_relative(pair: Pair<Rule>) -> Result<DurationAst, ParseError> {
    let mut count = None;
    let mut unit = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::number => count = Some(parse_number(p.as_str())?),
            Rule::time_unit => {
                let kw = p
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("empty time unit"))?;
                unit = Some(match kw.as_rule() {
                    Rule::kw_hour => TimeUnit::Hours,
                    Rule::kw_minute => TimeUnit::Minutes,
                    Rule::kw_second => TimeUnit::Seconds,
                    _ => return Err(ParseError::Shape("unknown time unit")),
                });
            },
            _ => return Err(ParseError::Shape("unexpected relative time shape")),
        }
    }
    Ok(DurationAst::Relative {
        count: count.ok_or(ParseError::Shape("relative time missing count"))?,
        unit: unit.ok_or(ParseError::Shape("relative time missing unit"))?,
    })
}

pub(super) fn parse_duration(pair: Pair<Rule>) -> Result<DurationAst, ParseError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty duration"))?;
    match inner.as_rule() {
        Rule::clock => Ok(DurationAst::Clock(parse_clock(inner)?)),
        Rule::relative_time => parse_relative(inner),
        _ => Err(ParseError::Shape("unknown duration kind")),
    }
}

fn parse_day_list(pair: Pair<Rule>) -> Result<Vec<DaySpec>, ParseError> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::day_word)
        .map(|p| parse_day(p.as_str()))
        .collect()
}

fn parse_day(word: &str) -> Result<DaySpec, ParseError> {
    let w = word.to_ascii_lowercase();
    let spec = match w.as_str() {
        "mon" | "monday" => DaySpec::Mon,
        "tue" | "tuesday" => DaySpec::Tue,
        "wed" | "wednesday" => DaySpec::Wed,
        "thu" | "thursday" => DaySpec::Thu,
        "fri" | "friday" => DaySpec::Fri,
        "sat" | "saturday" => DaySpec::Sat,
        "sun" | "sunday" => DaySpec::Sun,
        "weekday" | "weekdays" => DaySpec::Weekday,
        "weekend" | "weekends" => DaySpec::Weekend,
        _ => return Err(ParseError::Shape("unknown day word")),
    };
    Ok(spec)
}
