//! Built-in rule catalog.
//!
//! Rule order inside each set is significant: the first matching rule wins.
//! Patterns are matched case-insensitively; `multiline` rules also let `.`
//! cross line breaks.

use crate::outcome::Severity;

#[derive(Debug, Clone, Copy)]
pub struct BuiltinRule {
    pub pattern: &'static str,
    pub severity: Severity,
    pub multiline: bool,
    pub email_group: Option<usize>,
}

const fn hard(pattern: &'static str) -> BuiltinRule {
    BuiltinRule {
        pattern,
        severity: Severity::Hard,
        multiline: false,
        email_group: None,
    }
}

const fn soft(pattern: &'static str) -> BuiltinRule {
    BuiltinRule {
        pattern,
        severity: Severity::Soft,
        multiline: false,
        email_group: None,
    }
}

const fn hard_ml(pattern: &'static str) -> BuiltinRule {
    BuiltinRule {
        multiline: true,
        ..hard(pattern)
    }
}

const fn soft_ml(pattern: &'static str) -> BuiltinRule {
    BuiltinRule {
        multiline: true,
        ..soft(pattern)
    }
}

const fn captures(rule: BuiltinRule, group: usize) -> BuiltinRule {
    BuiltinRule {
        email_group: Some(group),
        ..rule
    }
}

/// Matched against the `Diagnostic-Code` field of a delivery-status block.
pub const DIAGNOSTIC_CODE_RULES: &[BuiltinRule] = &[
    // quota / storage
    soft_ml(r"(over|exceed).*quota"),
    soft_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*full"),
    soft_ml(r"Insufficient system storage"),
    soft_ml(r"File too large"),
    soft_ml(r"larger than.*limit"),
    // unknown or disabled recipients
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user)(.*)not(.*)list"),
    hard_ml(r"user path no exist"),
    hard_ml(r"Relay.*(?:denied|prohibited)"),
    hard_ml(r"no.*valid.*(?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"Invalid.*(?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*(?:disabled|discontinued)"),
    hard_ml(r"user doesn't have.*account"),
    hard_ml(r"(?:unknown|illegal).*(?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*(?:un|not\s+)available"),
    hard_ml(r"no (?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*unknown"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*disabled"),
    hard_ml(r"No such (?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*NOT FOUND"),
    hard_ml(r"deactivated (?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*reject"),
    hard_ml(r"bounce.*administrator"),
    hard_ml(r"<.*>.*disabled"),
    hard_ml(r"not our customer"),
    hard_ml(r"Wrong (?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"(?:unknown|bad).*(?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*not OK"),
    hard_ml(r"Access.*Denied"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*lookup.*fail"),
    hard_ml(r"(?:recipient|address|email|mailbox|user).*not.*member of domain"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*cannot be verified"),
    hard_ml(r"Unable to relay"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*(?:n't|not) exist"),
    hard_ml(r"not have an account"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*is not allowed"),
    hard_ml(r"inactive.*(?:alias|account|recipient|address|email|mailbox|user)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*Inactive"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user) closed due to inactivity"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user) not activated"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*(?:suspend|expire)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*no longer exist"),
    hard_ml(r"(?:forgery|abuse)"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*restrict"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user).*locked"),
    hard_ml(r"(?:alias|account|recipient|address|email|mailbox|user) refused"),
    // sender, relay and content policy
    hard_ml(r"sender.*not"),
    hard_ml(r"Message (refused|reject(ed)?)"),
    hard_ml(r"No permit"),
    hard_ml(r"domain isn't in.*allowed rcpthost"),
    hard_ml(r"AUTH FAILED"),
    hard_ml(r"relay.*not.*(?:permit|allow)"),
    hard_ml(r"not local host"),
    hard_ml(r"Unauthorized relay"),
    hard_ml(r"Transaction.*fail"),
    hard_ml(r"Invalid data"),
    hard_ml(r"Local user only"),
    hard_ml(r"not.*permit.*to"),
    hard_ml(r"Content reject"),
    hard_ml(r"MIME/REJECT"),
    hard_ml(r"MIME error"),
    hard_ml(r"Mail data refused.*AISP"),
    // routing
    hard_ml(r"Host unknown"),
    hard_ml(r"Specified domain.*not.*allow"),
    hard_ml(r"No route to host"),
    hard_ml(r"unrouteable address"),
    soft_ml(r"System.*busy"),
    soft_ml(r"Resources temporarily unavailable"),
    // blocked or filtered
    hard_ml(r"sender is rejected"),
    hard_ml(r"Client host rejected"),
    hard_ml(r"MAIL FROM(.*)mismatches client IP"),
    hard_ml(r"denyip"),
    hard_ml(r"client host.*blocked"),
    hard_ml(r"mail.*reject"),
    hard_ml(r"spam.*detect"),
    hard_ml(r"reject.*spam"),
    hard_ml(r"SpamTrap"),
    hard_ml(r"Verify mailfrom failed"),
    hard_ml(r"MAIL.*FROM.*mismatch"),
    hard_ml(r"spam scale"),
    hard_ml(r"junk mail"),
    hard_ml(r"message filtered"),
    hard_ml(r"subject.*consider.*spam"),
    soft_ml(r"Temporary local problem"),
    soft_ml(r"system config error"),
    hard_ml(r"(\s+)?\(RTR:BL\)"),
];

/// Matched against the human-readable explanation part of a DSN.
pub const DELIVERY_STATUS_MESSAGE_RULES: &[BuiltinRule] = &[
    soft_ml(r"delivery.*suspend"),
    hard(r"(?:alias|account|recipient|address|email|mailbox|user)(.*)invalid"),
    hard(r"Deferred.*No such.*(?:file|directory)"),
    hard(r"mail receiving disabled"),
    hard(r"bad.*(?:alias|account|recipient|address|email|mailbox|user)"),
    soft(r"over.*quota"),
    soft(r"quota.*exceeded"),
    soft(r"exceed.*\n?.*quota"),
    soft(r"(?:alias|account|recipient|address|email|mailbox|user).*full"),
    soft(r"space.*not.*enough"),
    soft(r"Deferred.*Connection (?:refused|reset)"),
    hard(r"Invalid host name"),
    hard(r"Deferred.*No route to host"),
    hard(r"Host unknown"),
    hard(r"Name server timeout"),
    hard(r"Deferred.*Connection.*tim(?:e|ed).*out"),
    hard(r"Deferred.*host name lookup failure"),
    hard(r"MX list.*point.*back"),
    soft(r"I/O error"),
    soft(r"connection.*broken"),
    hard(r"Delivery to the following recipients failed"),
    hard(r"User unknown"),
    hard(r"Service unavailable"),
];

/// Matched against a free-text bounce body. Each rule names the capture
/// group that holds the bounced address.
pub const BODY_RULES: &[BuiltinRule] = &[
    captures(hard(r"(\S+@\S+\w).*\n?.*no such address here"), 1),
    captures(hard(r"<(\S+@\S+\w)>.*\n?.*\n?.*user unknown"), 1),
    captures(hard(r"<(\S+@\S+\w)>.*\n?.*no mailbox"), 1),
    captures(hard(r"(\S+@\S+\w)<br>.*\n?.*\n?.*can't find.*mailbox"), 1),
    captures(hard(r"Can't create output.*\n?.*<(\S+@\S+\w)>"), 1),
    // GB2312 "recipient does not exist", still quoted-printable encoded
    captures(hard(r"(\S+@\S+\w).*=D5=CA=BA=C5=B2=BB=B4=E6=D4=DA"), 1),
    captures(hard(r"(\S+@\S+\w).*\n?.*Unrouteable address"), 1),
    captures(hard_ml(r"delivery[^\n\r]+failed\S*\s+(\S+@\S+\w)\s"), 1),
    captures(hard(r"(\S+@\S+\w).*\n?.*unknown local-part"), 1),
    captures(
        hard(r"Invalid.*(?:alias|account|recipient|address|email|mailbox|user).*<(\S+@\S+\w)>"),
        1,
    ),
    captures(
        hard(r"\s(\S+@\S+\w).*No such.*(?:alias|account|recipient|address|email|mailbox|user)>"),
        1,
    ),
    captures(
        hard(r"<(\S+@\S+\w)>.*\n?.*(?:alias|account|recipient|address|email|mailbox|user).*no.*accept.*mail>"),
        1,
    ),
    captures(soft(r"<(\S+@\S+\w)>.*\n?.*\n?.*over.*quota"), 1),
    captures(soft(r"quota exceeded.*\n?.*<(\S+@\S+\w)>"), 1),
    captures(soft(r"<(\S+@\S+\w)>.*\n?.*quota exceeded"), 1),
    captures(soft(r"\s(\S+@\S+\w)\s.*\n?.*mailbox.*full"), 1),
    captures(soft(r"The message to (\S+@\S+\w)\s.*bounce.*Quota exceed"), 1),
    captures(hard(r"(\S+@\S+\w)<br>.*\n?.*\n?.*user is inactive"), 1),
    captures(hard(r"(\S+@\S+\w).*inactive account"), 1),
    captures(hard(r"<(\S+@\S+\w)>.*\n?.*input/output error"), 1),
    captures(hard(r"<(\S+@\S+\w)>.*\n?.*can not open new email file"), 1),
    captures(soft(r"<(\S+@\S+\w)>.*\n?.*\n?.*Resources temporarily unavailable"), 1),
    captures(soft(r"^AutoReply message from (\S+@\S+\w)"), 1),
    captures(hard(r"<(\S+@\S+\w)>.*\n?.*does not accept[^\r\n]*non-Western"), 1),
];

/// Last-resort phrases, tried against whatever text the classifier holds.
pub const COMMON_RULES: &[BuiltinRule] = &[
    soft(r"(user\shas\s)?exceeded(\s+storage\sallocation)?"),
    soft(r"mail(box|folder)(\s+)?(is|full|quota|size)(\s+)?(full|usage|limit)?(\s+)?(exceeded)?"),
    soft(r"quota\s(full|violation)"),
    soft(r"User\s(has|mail(box|folder))\s+((exhausted|exceeds)\sallowed\s(size|.*space)|(too\smany.*server))"),
    soft(r"delivery\s(temporarily\ssuspended|attempts\swill\scontinue\sto\sbe\smade\sfor)"),
    soft(r"greylist(ing|ed)\s(in|for)\s(\w+(\sminutes)?)"),
    soft(r"(server|system)\s(load\sis\s)?(too\s)?(busy|high)"),
    soft(r"too\s(busy|many|much)\s(to\saccept\smail|connections?|sessions?|load)"),
    soft(r"temporarily\s(deferred|unavailable)"),
    soft(r"try\slater|retry\stimeout\sexceeded|queue\stoo\slong"),
    // de: mailbox full
    soft(r"Benutzer\shat\szuviele\sMails\sauf\sdem\sServer"),
    // it: unknown recipient
    hard(r"destin\.\sSconosciuto"),
    hard(r"Destinatario\serrato"),
    hard(r"Destinatario\ssconosciuto\so\smailbox\sdisatttivata"),
    hard(r"Indirizzo\sinesistente"),
    // pl: unknown recipient
    hard(r"nie\sistnieje"),
    hard(r"Nie\sma\stakiego\skonta"),
    // es: expired
    hard(r"Esta\scasilla\sha\sexpirado\spor\sfalta\sde\suso"),
    // de / fr: disabled
    hard(r"Adressat\sunbekannt\soder\sMailbox\sdeaktiviert"),
    hard(r"Destinataire\sinconnu\sou\sboite\saux\slettres\sdesactivee"),
    // es / pl / it: inactive
    hard(r"El\susuario\sesta\sen\sestado:\sinactivo"),
    hard(r"Podane\skonto\sjest\szablokowane\sadministracyjnie\slub\snieaktywne"),
    hard(r"Questo\sindirizzo\se'\sbloccato\sper\sinutilizzo"),
    // pl: rejected as spam
    hard(r"Wiadomosc\szostala\sodrzucona\sprzez\ssystem\santyspamowy"),
];
