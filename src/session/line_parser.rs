use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, space1},
    combinator::{map_res, opt, recognize},
    sequence::preceded,
};

use super::{SessionError, SessionEvent, SessionResult};
use crate::trace::{FrameRecord, ThreadId, TreePosition, UiEvent};

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_session_line(line: &str) -> SessionResult<Option<SessionEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (rest, command) = parse_command(trimmed)
        .map_err(|_| SessionError::UnknownCommand(trimmed.to_string()))?;

    let parsed = match command {
        "add_thread" => parse_thread_id(rest).map(|(r, id)| (r, SessionEvent::AddThread(id))),
        "remove_thread" => {
            parse_thread_id(rest).map(|(r, id)| (r, SessionEvent::RemoveThread(id)))
        }
        "set_active_thread" => {
            parse_thread_id(rest).map(|(r, id)| (r, SessionEvent::SetActiveThread(id)))
        }
        "add_frame" => parse_frame(rest).map(|(r, frame)| (r, SessionEvent::AddFrame(frame))),
        "remove_frames" => Ok((rest, SessionEvent::RemoveFrames)),
        "clear" => Ok((rest, SessionEvent::Clear)),
        "select_first_frame" => opt(preceded(space1, tag("active")))
            .parse(rest)
            .map(|(r, active)| {
                (
                    r,
                    SessionEvent::SelectFirstFrame {
                        make_active: active.is_some(),
                    },
                )
            }),
        "select" => parse_position(rest)
            .map(|(r, pos)| (r, SessionEvent::Ui(UiEvent::RowSelected(pos)))),
        "activate" => parse_frame_position(rest)
            .map(|(r, pos)| (r, SessionEvent::Ui(UiEvent::RowActivatedAgain(pos)))),
        "arrow" => parse_frame_position(rest)
            .map(|(r, pos)| (r, SessionEvent::Ui(UiEvent::ArrowClicked(pos)))),
        _ => return Err(SessionError::UnknownCommand(command.to_string())),
    };

    let invalid = |details: String| SessionError::InvalidArguments {
        command: command.to_string(),
        details,
    };

    let (rest, event) = parsed.map_err(|e| invalid(e.to_string()))?;
    if !rest.trim().is_empty() {
        return Err(invalid(format!("unexpected trailing input '{}'", rest.trim())));
    }

    Ok(Some(event))
}

/// Command keyword at the start of the line
fn parse_command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_lowercase() || c == '_')(input)
}

/// Whitespace-separated word
fn parse_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

fn parse_thread_id(input: &str) -> IResult<&str, ThreadId> {
    preceded(
        space1,
        map_res(recognize((opt(char('-')), digit1)), |s: &str| {
            s.parse::<ThreadId>()
        }),
    )
    .parse(input)
}

fn parse_index(input: &str) -> IResult<&str, usize> {
    preceded(space1, map_res(digit1, |s: &str| s.parse::<usize>())).parse(input)
}

/// `<thread_idx> [<frame_idx>]`
fn parse_position(input: &str) -> IResult<&str, TreePosition> {
    let (rest, thread) = parse_index(input)?;
    let (rest, frame) = opt(parse_index).parse(rest)?;
    Ok((rest, TreePosition { thread, frame }))
}

/// `<thread_idx> <frame_idx>`
fn parse_frame_position(input: &str) -> IResult<&str, TreePosition> {
    let (rest, thread) = parse_index(input)?;
    let (rest, frame) = parse_index(rest)?;
    Ok((rest, TreePosition::frame(thread, frame)))
}

/// `<address> <function> [<file>:<line>] [nosource]`
fn parse_frame(input: &str) -> IResult<&str, FrameRecord> {
    let (rest, address) = preceded(space1, parse_token).parse(input)?;
    let (rest, function) = preceded(space1, parse_token).parse(rest)?;
    let (rest, location) = opt(preceded(space1, parse_location)).parse(rest)?;
    let (rest, nosource) = opt(preceded(space1, tag("nosource"))).parse(rest)?;

    let frame = FrameRecord::new(address, function);
    let frame = match location {
        Some((file, line)) => frame.with_location(file, line, nosource.is_none()),
        None => frame,
    };

    Ok((rest, frame))
}

/// `<file>:<line>`, splitting at the last colon so paths may contain colons
fn parse_location(input: &str) -> IResult<&str, (&str, u32)> {
    let (rest, token) = parse_token(input)?;

    let location = token
        .rsplit_once(':')
        .filter(|(file, _)| !file.is_empty())
        .and_then(|(file, line)| line.parse::<u32>().ok().map(|line| (file, line)));

    match location {
        Some(location) => Ok((rest, location)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(line: &str) -> SessionEvent {
        parse_session_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_thread_commands() {
        assert_eq!(event("add_thread 12"), SessionEvent::AddThread(12));
        assert_eq!(event("  remove_thread 3  "), SessionEvent::RemoveThread(3));
        assert_eq!(event("set_active_thread -1"), SessionEvent::SetActiveThread(-1));
    }

    #[test]
    fn test_parse_frame_with_source() {
        let SessionEvent::AddFrame(frame) = event("add_frame 0x401136 main /src/main.c:12")
        else {
            panic!("expected a frame");
        };

        assert_eq!(frame.address, "0x401136");
        assert_eq!(frame.function, "main");
        assert_eq!(frame.file.as_deref(), Some("/src/main.c"));
        assert_eq!(frame.line, 12);
        assert!(frame.has_source);
    }

    #[test]
    fn test_parse_frame_nosource() {
        let SessionEvent::AddFrame(frame) =
            event("add_frame 0x7ffff7a2d830 __libc_start_main ../csu/libc-start.c:291 nosource")
        else {
            panic!("expected a frame");
        };

        assert_eq!(frame.file.as_deref(), Some("../csu/libc-start.c"));
        assert_eq!(frame.line, 291);
        assert!(!frame.has_source);
    }

    #[test]
    fn test_parse_frame_without_location() {
        let SessionEvent::AddFrame(frame) = event("add_frame 0x7ffff7a2d830 ??") else {
            panic!("expected a frame");
        };

        assert_eq!(frame.function, "??");
        assert_eq!(frame.file, None);
        assert!(!frame.has_source);
    }

    #[test]
    fn test_parse_frame_windows_path() {
        let SessionEvent::AddFrame(frame) = event("add_frame 0x10 main C:\\src\\main.c:5") else {
            panic!("expected a frame");
        };

        assert_eq!(frame.file.as_deref(), Some("C:\\src\\main.c"));
        assert_eq!(frame.line, 5);
    }

    #[test]
    fn test_parse_select_first_frame() {
        assert_eq!(
            event("select_first_frame"),
            SessionEvent::SelectFirstFrame { make_active: false }
        );
        assert_eq!(
            event("select_first_frame active"),
            SessionEvent::SelectFirstFrame { make_active: true }
        );
    }

    #[test]
    fn test_parse_ui_events() {
        assert_eq!(
            event("select 1"),
            SessionEvent::Ui(UiEvent::RowSelected(TreePosition::thread(1)))
        );
        assert_eq!(
            event("select 0 2"),
            SessionEvent::Ui(UiEvent::RowSelected(TreePosition::frame(0, 2)))
        );
        assert_eq!(
            event("activate 0 2"),
            SessionEvent::Ui(UiEvent::RowActivatedAgain(TreePosition::frame(0, 2)))
        );
        assert_eq!(
            event("arrow 1 0"),
            SessionEvent::Ui(UiEvent::ArrowClicked(TreePosition::frame(1, 0)))
        );
    }

    #[test]
    fn test_skip_blank_and_comments() {
        assert_eq!(parse_session_line("").unwrap(), None);
        assert_eq!(parse_session_line("   ").unwrap(), None);
        assert_eq!(parse_session_line("# stopped at breakpoint").unwrap(), None);
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            parse_session_line("continue"),
            Err(SessionError::UnknownCommand(cmd)) if cmd == "continue"
        ));
        assert!(matches!(
            parse_session_line("42"),
            Err(SessionError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            parse_session_line("add_thread x"),
            Err(SessionError::InvalidArguments { command, .. }) if command == "add_thread"
        ));
        assert!(matches!(
            parse_session_line("arrow 1"),
            Err(SessionError::InvalidArguments { .. })
        ));
        assert!(matches!(
            parse_session_line("clear now"),
            Err(SessionError::InvalidArguments { .. })
        ));
    }
}
