use crate::model::config::Rule;

#[derive(Default)]
pub struct EvalLogBuilder {
    content: String,
    indent: usize,
}

impl EvalLogBuilder {
    const NEW_LINE_CHAR: char = '\n';
    const INDENT_SEQ: &'static str = "  ";

    pub fn inc_indent(&mut self) -> &mut Self {
        self.indent += 1;
        self
    }

    pub fn dec_indent(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    pub fn new_ln(&mut self, message: Option<&str>) -> &mut Self {
        self.content.push(Self::NEW_LINE_CHAR);
        self.content
            .push_str(Self::INDENT_SEQ.repeat(self.indent).as_str());
        if let Some(msg) = message {
            self.content.push_str(msg)
        }
        self
    }

    pub fn append(&mut self, val: &str) -> &mut Self {
        self.content.push_str(val);
        self
    }

    pub fn append_rule_result(&mut self, index: usize, rule: &Rule, matched: bool) -> &mut Self {
        self.new_ln(Some(format!("- Rule #{}: {rule}", index + 1).as_str()));
        if matched {
            self.append(" => MATCH, applying rule")
        } else {
            self.append(" => no match")
        }
    }

    pub fn content(&self) -> &str {
        self.content.as_str()
    }
}
