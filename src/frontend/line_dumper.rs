use std::fmt;

use crate::lang::{ClassifiedLine, ControlShape, Line, Program};

pub struct LineDumper {
    pub color: bool,
    pub show_text: bool, // if false, only number, hint and shape are printed
}

impl Default for LineDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_text: true,
        }
    }
}

impl LineDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn compact(mut self) -> Self {
        self.show_text = false;
        self
    }

    pub fn dump(&self, program: &Program, classified: &[ClassifiedLine]) {
        print!("{}", self.view(program, classified));
    }

    /// One row per line. `classified` must be in program order.
    pub fn render(&self, program: &Program, classified: &[ClassifiedLine]) -> String {
        self.view(program, classified).to_string()
    }

    pub fn view<'a>(&'a self, program: &'a Program, classified: &'a [ClassifiedLine]) -> LineDump<'a> {
        LineDump {
            dumper: self,
            program,
            classified,
        }
    }

    fn write_one(&self, f: &mut fmt::Formatter<'_>, line: &Line, c: &ClassifiedLine) -> fmt::Result {
        let reset = if self.color { Self::RESET } else { "" };
        let paint = |code: &'static str| if self.color { code } else { "" };

        let hint = line.task_hint.as_deref().unwrap_or("-");
        write!(
            f,
            "[{:05}] {}{:<10}{} {}{:<8}{}",
            line.number,
            paint(Self::YEL),
            hint,
            reset,
            paint(self.shape_color(&c.shape)),
            c.shape.name(),
            reset,
        )?;

        match &c.shape {
            ControlShape::UnconditionalJump { target } | ControlShape::Call { target } => {
                write!(f, " -> {}", target)?;
            }
            ControlShape::ConditionalJump { target, predicate } => {
                write!(f, " -> {} if ({})", target, predicate)?;
            }
            ControlShape::Fallthrough | ControlShape::Return => {}
        }

        if let Some(handler) = c.error_handler_update {
            write!(f, " {}on error -> {}{}", paint(Self::MAG), handler, reset)?;
        }

        if self.show_text && !line.text.is_empty() {
            write!(f, "  {}{}{}", paint(Self::DIM), line.text, reset)?;
        }

        writeln!(f)
    }

    fn shape_color(&self, shape: &ControlShape) -> &'static str {
        match shape {
            ControlShape::Fallthrough => Self::DIM,
            ControlShape::UnconditionalJump { .. } | ControlShape::ConditionalJump { .. } => {
                Self::CYN
            }
            ControlShape::Call { .. } | ControlShape::Return => Self::GRN,
        }
    }
}

/// Parsed lines bound to a dumper, ready to display.
pub struct LineDump<'a> {
    dumper: &'a LineDumper,
    program: &'a Program,
    classified: &'a [ClassifiedLine],
}

impl fmt::Display for LineDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, c) in self.program.lines().iter().zip(self.classified) {
            self.dumper.write_one(f, line, c)?;
        }
        Ok(())
    }
}
