use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::data::filter::{City, DaySelector, FilterSpec, MonthSelector, SelectorError};
use crate::data::model::TripTable;
use crate::report;
use crate::stats::raw::RowCursor;

/// Selectors fixed on the command line; the rest are asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preset {
    pub city: Option<City>,
    pub month: Option<MonthSelector>,
    pub day: Option<DaySelector>,
}

impl Preset {
    /// The full selection, when nothing is left to ask.
    pub fn complete(&self) -> Option<FilterSpec> {
        Some(FilterSpec::new(self.city?, self.month?, self.day?))
    }
}

/// Line-oriented question and answer over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompter { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Print `question` and read one trimmed line. `None` at end of input.
    pub fn ask(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{question}").context("writing prompt")?;
        self.output.flush().context("flushing prompt")?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("reading answer")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask until the answer parses. Invalid answers are explained and the
    /// question repeated.
    pub fn choose<T>(&mut self, question: &str) -> Result<T>
    where
        T: FromStr<Err = SelectorError>,
    {
        loop {
            let Some(answer) = self.ask(question)? else {
                bail!("input closed while waiting for an answer to '{}'", question.trim());
            };
            match answer.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::debug!("Rejected answer: {e}");
                    writeln!(self.output, "\nYou have typed an invalid {}. Please type one of {}\n", e.kind, e.expected)
                        .context("writing prompt")?;
                }
            }
        }
    }

    /// `true` only for a "yes" answer (any case). End of input counts as no.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self
            .ask(question)?
            .is_some_and(|a| a.eq_ignore_ascii_case("yes")))
    }

    /// Ask for whichever of city, month and day `preset` leaves open.
    pub fn get_filters(&mut self, preset: &Preset) -> Result<FilterSpec> {
        writeln!(self.output, "Hello! Let's explore some US bikeshare data!").context("writing prompt")?;

        let city = match preset.city {
            Some(city) => city,
            None => self.choose("Type city (chicago, new york city, washington): ")?,
        };
        let month = match preset.month {
            Some(month) => month,
            None => self.choose("Type month (january - june, or all): ")?,
        };
        let day = match preset.day {
            Some(day) => day,
            None => self.choose("Type day (sunday - saturday, or all): ")?,
        };

        writeln!(self.output, "{}", "-".repeat(40)).context("writing prompt")?;
        Ok(FilterSpec::new(city, month, day))
    }

    /// Show the filtered table five rows at a time for as long as the user
    /// keeps answering "yes".
    pub fn view_raw_data(&mut self, table: &TripTable) -> Result<()> {
        let mut cursor = RowCursor::new(table);
        while self.confirm("\nWould you like to see the raw data? Enter 'yes' or 'no'.\n")? {
            if cursor.exhausted() {
                writeln!(self.output, "\nNo more data to display").context("writing rows")?;
                break;
            }
            let first_row = cursor.position();
            let page = cursor.advance();
            writeln!(self.output, "Printing {} rows of raw data:\n", page.len()).context("writing rows")?;
            report::write_rows(&mut self.output, table, page, first_row).context("writing rows")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::io::Cursor;

    use chrono::Weekday;

    use super::*;
    use crate::data::model::{parse_timestamp, Column, TripRecord};

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(p: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.output).unwrap()
    }

    #[test]
    fn reprompts_until_valid() {
        let mut p = prompter("boston\n  Chicago \nJuly\nmarch\ntueday\nTuesday\n");
        let spec = p.get_filters(&Preset::default()).unwrap();
        assert_eq!(
            spec,
            FilterSpec::new(City::Chicago, MonthSelector::month(3).unwrap(), DaySelector::Day(Weekday::Tue))
        );
        let text = output(p);
        assert!(text.contains("You have typed an invalid city"));
        assert!(text.contains("You have typed an invalid month"));
        assert!(text.contains("You have typed an invalid day"));
    }

    #[test]
    fn preset_values_are_not_asked_for() {
        let mut p = prompter("all\n");
        let preset = Preset {
            city: Some(City::Washington),
            month: MonthSelector::month(1),
            day: None,
        };
        let spec = p.get_filters(&preset).unwrap();
        assert_eq!(spec.city, City::Washington);
        assert_eq!(spec.day, DaySelector::All);
        let text = output(p);
        assert!(!text.contains("Type city"));
        assert!(text.contains("Type day"));
    }

    #[test]
    fn complete_preset_needs_all_three() {
        let mut preset = Preset {
            city: Some(City::Chicago),
            month: Some(MonthSelector::All),
            day: None,
        };
        assert_eq!(preset.complete(), None);
        preset.day = Some(DaySelector::Day(Weekday::Fri));
        assert_eq!(
            preset.complete(),
            Some(FilterSpec::new(City::Chicago, MonthSelector::All, DaySelector::Day(Weekday::Fri)))
        );
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut p = prompter("");
        assert!(p.get_filters(&Preset::default()).is_err());
    }

    #[test]
    fn confirm_accepts_only_yes() {
        let mut p = prompter("YES\nno\ny\n");
        assert!(p.confirm("? ").unwrap());
        assert!(!p.confirm("? ").unwrap());
        assert!(!p.confirm("? ").unwrap());
        assert!(!p.confirm("? ").unwrap());
    }

    #[test]
    fn raw_data_pages_until_exhausted() {
        let start = parse_timestamp("2017-01-01 00:00:00").unwrap();
        let table = TripTable::new(
            (0..7)
                .map(|i| TripRecord::new(start, format!("Station {i}"), "End"))
                .collect(),
            BTreeSet::from(Column::REQUIRED),
        );
        let mut p = prompter("yes\nyes\nyes\nyes\n");
        p.view_raw_data(&table).unwrap();
        let text = output(p);
        assert!(text.contains("Printing 5 rows of raw data"));
        assert!(text.contains("Printing 2 rows of raw data"));
        assert!(text.contains("Station 6"));
        assert!(text.contains("No more data to display"));
    }

    #[test]
    fn raw_data_stops_on_no() {
        let start = parse_timestamp("2017-01-01 00:00:00").unwrap();
        let table = TripTable::new(
            vec![TripRecord::new(start, "A", "B")],
            BTreeSet::from(Column::REQUIRED),
        );
        let mut p = prompter("no\nyes\n");
        p.view_raw_data(&table).unwrap();
        assert!(!output(p).contains("Printing"));
    }
}
