use crate::types::*;

const PIPE: char = '|';
const BACKGROUND: &str = "&";

struct Parser<'a> {
	line: &'a str,
	i: usize,
}

impl<'a> Parser<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.as_bytes().get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_delimiter(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\r' | b'\n' | b'\x07')
	}

	fn skip_delimiters(&mut self) {
		self.proceed_while(Parser::is_delimiter);
	}

	// Delimiters are ASCII, so word boundaries always fall on char boundaries.
	fn read_word(&mut self) -> &'a str {
		let orig = self.i;
		self.proceed_while(|c| !Parser::is_delimiter(c));
		&self.line[orig .. self.i]
	}
}

/// No quoting or escaping is interpreted.
pub fn tokenize(line: &str) -> ArgumentVector {
	let mut parser = Parser { line: line, i: 0 };
	let mut args = vec![];
	loop {
		parser.skip_delimiters();
		let word = parser.read_word();
		if word.is_empty() {
			break;
		}
		args.push(word.to_string());
	}
	args
}

/// Splits raw text on `|`. Empty stages are kept so the launcher can report them.
pub fn split_pipeline(line: &str) -> Vec<&str> {
	line.split(PIPE).collect()
}

pub fn is_pipeline(line: &str) -> bool {
	line.contains(PIPE)
}

pub fn strip_background(args: &mut ArgumentVector) -> bool {
	if args.last().map(String::as_str) == Some(BACKGROUND) {
		args.pop();
		true
	} else {
		false
	}
}

/// The argument vector ends at the first operator. Plain words after a
/// target are dropped.
pub fn parse_redirects(args: &[String]) -> Command {
	let mut command = Command::default();
	let mut truncated = false;
	let mut tokens = args.iter();
	while let Some(token) = tokens.next() {
		let typ = match token.as_str() {
			"<" => RedirectType::Input,
			">" => RedirectType::Output,
			_ => {
				if !truncated {
					command.argv.push(token.clone());
				}
				continue;
			},
		};
		truncated = true;
		match tokens.next() {
			Some(target) => command.redirects.push(Redirect { typ: typ, target: target.clone() }),
			None => {
				command.missing_target = Some(typ);
				break;
			},
		}
	}
	command
}

pub fn parse_pipeline(line: &str) -> Pipeline {
	let mut stages: Vec<ArgumentVector> = split_pipeline(line).into_iter().map(tokenize).collect();
	let is_background = match stages.last_mut() {
		Some(last) => strip_background(last),
		None => false,
	};
	Pipeline {
		commands: stages.iter().map(|args| parse_redirects(args)).collect(),
		is_background: is_background,
	}
}
