#![allow(dead_code)]
/**
 * Shared corpus
 *
 * Forum tag templates and documents exercised by the integration suites.
 */

use tagform_compiler::compiler::{Ruleset, TagDefinition};
use tagform_compiler::expression_parser::Parameters;
use tagform_compiler::schema::{AttributeDeclaration, AttributeDeclarations};

pub struct CorpusTag {
    pub name: &'static str,
    pub template: &'static str,
    /// Declared attributes and their filter chains
    pub attributes: &'static [(&'static str, &'static [&'static str])],
}

pub const TAGS: &[CorpusTag] = &[
    CorpusTag {
        name: "B",
        template: "<b><xsl:apply-templates/></b>",
        attributes: &[],
    },
    CorpusTag {
        name: "STRONG",
        template: "<b><xsl:apply-templates/></b>",
        attributes: &[],
    },
    CorpusTag {
        name: "I",
        template: "<i><xsl:apply-templates/></i>",
        attributes: &[],
    },
    CorpusTag {
        name: "U",
        template: r#"<span style="text-decoration: underline"><xsl:apply-templates/></span>"#,
        attributes: &[],
    },
    CorpusTag {
        name: "URL",
        template: r#"<a href="{@url}"><xsl:if test="@title"><xsl:attribute name="title"><xsl:value-of select="@title"/></xsl:attribute></xsl:if><xsl:apply-templates/></a>"#,
        attributes: &[("url", &["#url"]), ("title", &[])],
    },
    CorpusTag {
        name: "COLOR",
        template: r#"<span style="color:{@color}"><xsl:apply-templates/></span>"#,
        attributes: &[("color", &["#color"])],
    },
    CorpusTag {
        name: "SIZE",
        template: r#"<span style="font-size:{@size}px"><xsl:apply-templates/></span>"#,
        attributes: &[("size", &["#range"])],
    },
    CorpusTag {
        name: "QUOTE",
        template: concat!(
            r#"<blockquote><xsl:if test="not(@author)"><xsl:attribute name="class">uncited</xsl:attribute></xsl:if>"#,
            r#"<div><xsl:if test="@author"><cite><xsl:value-of select="@author"/><xsl:text> </xsl:text><xsl:value-of select="$L_WROTE"/></cite></xsl:if>"#,
            r#"<xsl:apply-templates/></div></blockquote>"#
        ),
        attributes: &[("author", &[])],
    },
    CorpusTag {
        name: "LIST",
        template: concat!(
            r#"<xsl:choose><xsl:when test="@type='decimal' or @type='1'"><ol><xsl:apply-templates/></ol></xsl:when>"#,
            r#"<xsl:when test="@type='upper-alpha'"><ol style="list-style-type:upper-alpha"><xsl:apply-templates/></ol></xsl:when>"#,
            r#"<xsl:otherwise><ul><xsl:apply-templates/></ul></xsl:otherwise></xsl:choose>"#
        ),
        attributes: &[("type", &[])],
    },
    CorpusTag {
        name: "LI",
        template: "<li><xsl:apply-templates/></li>",
        attributes: &[],
    },
    CorpusTag {
        name: "IMG",
        template: r#"<img src="{@src}" alt="{@alt}"/>"#,
        attributes: &[("src", &["#url"]), ("alt", &[])],
    },
    CorpusTag {
        name: "HR",
        template: "<hr/>",
        attributes: &[],
    },
    CorpusTag {
        name: "EMAIL",
        template: r#"<a href="mailto:{@email}"><xsl:apply-templates/></a>"#,
        attributes: &[("email", &["#email"])],
    },
    CorpusTag {
        name: "CODE",
        template: r#"<pre><code><xsl:if test="@lang"><xsl:attribute name="class">language-<xsl:value-of select="@lang"/></xsl:attribute></xsl:if><xsl:apply-templates/></code></pre>"#,
        attributes: &[("lang", &["#identifier"])],
    },
    CorpusTag {
        name: "SPOILER",
        template: concat!(
            r#"<details class="spoiler"><xsl:if test="@open"><xsl:attribute name="open">open</xsl:attribute></xsl:if>"#,
            r#"<summary><xsl:choose><xsl:when test="@title"><xsl:value-of select="@title"/></xsl:when>"#,
            r#"<xsl:otherwise><xsl:value-of select="$L_SPOILER"/></xsl:otherwise></xsl:choose></summary>"#,
            r#"<xsl:apply-templates/></details>"#
        ),
        attributes: &[("open", &[]), ("title", &[])],
    },
    CorpusTag {
        name: "NOTE",
        template: r#"<xsl:if test="$SHOW='1'"><aside class="note"><xsl:apply-templates/></aside></xsl:if>"#,
        attributes: &[],
    },
    CorpusTag {
        name: "ABBR",
        template: r#"<abbr><xsl:copy-of select="@title"/><xsl:apply-templates/></abbr>"#,
        attributes: &[("title", &[])],
    },
    CorpusTag {
        name: "BOX",
        template: concat!(
            r#"<div><xsl:choose><xsl:when test="@k='a'"><xsl:attribute name="class">a</xsl:attribute></xsl:when>"#,
            r#"<xsl:when test="@k='b'"><xsl:attribute name="class">b</xsl:attribute>B</xsl:when></xsl:choose>"#,
            r#"<xsl:apply-templates/></div>"#
        ),
        attributes: &[("k", &[])],
    },
    CorpusTag {
        name: "YOUTUBE",
        template: r#"<iframe width="560" height="315" src="https://www.youtube.com/embed/{@id}" allowfullscreen=""/>"#,
        attributes: &[("id", &["#identifier"])],
    },
    CorpusTag {
        name: "EMOJI",
        template: r#"<img alt="{.}" class="emoji" src="https://cdn.example/{@seq}.png"/>"#,
        attributes: &[("seq", &["#identifier"])],
    },
    CorpusTag {
        name: "C",
        template: "<xsl:comment> c </xsl:comment><xsl:apply-templates/>",
        attributes: &[],
    },
    CorpusTag {
        name: "LATE",
        template: r#"<b>x<xsl:attribute name="title">t</xsl:attribute><xsl:apply-templates/></b>"#,
        attributes: &[],
    },
    CorpusTag {
        name: "MAYBE",
        template: concat!(
            r#"<div><xsl:if test="@b">B</xsl:if>"#,
            r#"<xsl:if test="@c"><xsl:attribute name="class">c</xsl:attribute></xsl:if>"#,
            r#"<xsl:apply-templates/></div>"#
        ),
        attributes: &[("b", &[]), ("c", &[])],
    },
    CorpusTag {
        name: "TITLED",
        template: r#"<b title="a"><xsl:attribute name="title">b</xsl:attribute><xsl:apply-templates/></b>"#,
        attributes: &[],
    },
    CorpusTag {
        name: "COPIED",
        template: concat!(
            r#"<span title="x"><xsl:copy-of select="@*"/>"#,
            r#"<xsl:attribute name="title">fixed</xsl:attribute><xsl:apply-templates/></span>"#
        ),
        attributes: &[("id", &[]), ("title", &[])],
    },
    CorpusTag {
        name: "BREAK",
        template: concat!(
            r#"<br><xsl:choose><xsl:when test="@a"><xsl:attribute name="title"><xsl:value-of select="@a"/></xsl:attribute>A</xsl:when>"#,
            r#"<xsl:otherwise>O</xsl:otherwise></xsl:choose>"#,
            r#"<xsl:if test="@b"><xsl:attribute name="class">b</xsl:attribute></xsl:if>text</br>"#
        ),
        attributes: &[("a", &[]), ("b", &[])],
    },
];

/// Templates the verifier rejects, used where only the IR is under test
pub const UNVERIFIED_TEMPLATES: &[(&str, &str)] = &[
    (
        "HEADING",
        r#"<xsl:element name="h{@level}"><xsl:attribute name="id">h-<xsl:value-of select="@id"/></xsl:attribute><xsl:apply-templates/></xsl:element>"#,
    ),
    (
        "RAW",
        r#"<xsl:value-of select="@html" disable-output-escaping="yes"/>"#,
    ),
    (
        "NESTED",
        concat!(
            r#"<div><xsl:choose><xsl:when test="@a"><xsl:if test="@b"><xsl:attribute name="class">ab</xsl:attribute></xsl:if></xsl:when>"#,
            r#"<xsl:otherwise><xsl:attribute name="class">n</xsl:attribute></xsl:otherwise></xsl:choose>"#,
            r#"<span><xsl:if test="@c"><xsl:attribute name="title"><xsl:value-of select="@c"/></xsl:attribute></xsl:if></span>"#,
            r#"<xsl:apply-templates/></div>"#
        ),
    ),
    (
        "VOIDDYN",
        r#"<xsl:element name="{@tag}"><xsl:apply-templates/></xsl:element>"#,
    ),
    (
        "SCRIPTY",
        r#"<script>var x = "<xsl:value-of select="@v"/>";</script>"#,
    ),
];

pub const DOCUMENTS: &[&str] = &[
    "<r><B>bold</B> and <STRONG>strong</STRONG></r>",
    r#"<r><URL url="http://example.org" title="A &quot;title&quot;"><s>[url=http://example.org]</s>link<e>[/url]</e></URL><br/><URL url="https://x.test/?a=1&amp;b=2">x &lt; y</URL></r>"#,
    r#"<r><QUOTE author="Bob"><s>[quote="Bob"]</s>Hi<e>[/quote]</e></QUOTE><QUOTE>anon</QUOTE></r>"#,
    r#"<r><LIST type="decimal"><LI>one</LI><LI>two</LI></LIST><LIST><LI>x</LI></LIST><LIST type="upper-alpha"/><LIST type="1"/></r>"#,
    r#"<r><COLOR color="red">red</COLOR> <SIZE size="20">big</SIZE> <U>under</U> <I>it</I></r>"#,
    r#"<r><IMG src="http://x.test/y.png" alt="a &lt;b&gt;"/><HR/><EMAIL email="a@b.test">mail</EMAIL></r>"#,
    r#"<r><CODE lang="rust">fn main() {}</CODE><CODE>&lt;script&gt;</CODE></r>"#,
    r#"<r><SPOILER open="1" title="T">hidden</SPOILER><SPOILER>s</SPOILER></r>"#,
    r#"<r><NOTE>note</NOTE><ABBR title="HyperText">HT</ABBR><ABBR>no</ABBR></r>"#,
    r#"<r><BOX k="a">1</BOX><BOX k="b">2</BOX><BOX k="c">3</BOX><BOX/></r>"#,
    "<t>plain &amp; simple<p>para</p></t>",
    r#"<r><YOUTUBE id="abc"/><EMOJI seq="1f600">:)</EMOJI><C>x</C><UNKNOWN>transparent</UNKNOWN></r>"#,
    r#"<r><LATE>y</LATE><MAYBE b="1" c="1">x</MAYBE><MAYBE c="1">y</MAYBE><TITLED>t</TITLED></r>"#,
    r#"<r><COPIED id="i" title="q">z</COPIED><COPIED>w</COPIED><BREAK a="1" b="1"/><BREAK b="1">gone</BREAK></r>"#,
];

/// Documents for the templates in [`UNVERIFIED_TEMPLATES`]
pub const UNVERIFIED_DOCUMENTS: &[&str] = &[
    r#"<r><HEADING level="2" id="x">T</HEADING><RAW html="&lt;b&gt;"/></r>"#,
    r#"<r><NESTED a="1" b="1" c="q">z</NESTED><NESTED>y</NESTED><NESTED a="1">w</NESTED></r>"#,
    r#"<r><VOIDDYN tag="br">gone</VOIDDYN><VOIDDYN tag="em">kept</VOIDDYN><SCRIPTY v="a&lt;b"/></r>"#,
];

pub const PARAMETERS: &[(&str, &str)] = &[
    ("L_WROTE", "wrote:"),
    ("L_SPOILER", "Spoiler"),
    ("SHOW", "1"),
];

pub fn parameters() -> Parameters {
    PARAMETERS
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

pub fn declarations(tag: &CorpusTag) -> AttributeDeclarations {
    tag.attributes
        .iter()
        .map(|(name, filters)| {
            let declaration = filters
                .iter()
                .fold(AttributeDeclaration::new(), |declaration, filter| {
                    declaration.with_filter(*filter)
                });
            (name.to_string(), declaration)
        })
        .collect()
}

pub fn ruleset() -> Ruleset {
    Ruleset {
        tags: TAGS
            .iter()
            .map(|tag| {
                (
                    tag.name.to_string(),
                    TagDefinition::new(tag.template).with_attributes(declarations(tag)),
                )
            })
            .collect(),
        parameters: parameters(),
        ..Default::default()
    }
}

/// Every template of the corpus, verified or not
pub fn all_templates() -> Vec<(&'static str, &'static str)> {
    TAGS.iter()
        .map(|tag| (tag.name, tag.template))
        .chain(UNVERIFIED_TEMPLATES.iter().copied())
        .collect()
}

/// Every document of the corpus
pub fn all_documents() -> Vec<&'static str> {
    DOCUMENTS
        .iter()
        .chain(UNVERIFIED_DOCUMENTS.iter())
        .copied()
        .collect()
}
