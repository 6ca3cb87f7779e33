//! Fixed header, per-table and footer text of the dump format.
//!
//! The text follows the conventions of `mysqldump` output so that standard
//! restore tooling accepts it: versioned `/*!NNNNN ... */` comments save and
//! restore session variables around the statements.

use std::io::{self, Write};

use crate::core::db::{quote_ident, TableDescriptor};

const HEADER_DIRECTIVES: &[&str] = &[
    "/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;",
    "/*!40101 SET @OLD_CHARACTER_SET_RESULTS=@@CHARACTER_SET_RESULTS */;",
    "/*!40101 SET @OLD_COLLATION_CONNECTION=@@COLLATION_CONNECTION */;",
    "/*!50503 SET NAMES UTF8 */;",
    "/*!40103 SET @OLD_TIME_ZONE=@@TIME_ZONE */;",
    "/*!40103 SET TIME_ZONE='+00:00' */;",
    "/*!40014 SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0 */;",
    "/*!40014 SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0 */;",
    "/*!40101 SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='NO_AUTO_VALUE_ON_ZERO' */;",
    "/*!40111 SET @OLD_SQL_NOTES=@@SQL_NOTES, SQL_NOTES=0 */;",
];

const TIME_ZONE_RESTORE: &str = "/*!40103 SET TIME_ZONE=@OLD_TIME_ZONE */;";

const FOOTER_DIRECTIVES: &[&str] = &[
    "/*!40101 SET SQL_MODE=@OLD_SQL_MODE */;",
    "/*!40014 SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS */;",
    "/*!40014 SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS */;",
    "/*!40101 SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT */;",
    "/*!40101 SET CHARACTER_SET_RESULTS=@OLD_CHARACTER_SET_RESULTS */;",
    "/*!40101 SET COLLATION_CONNECTION=@OLD_COLLATION_CONNECTION */;",
    "/*!40111 SET SQL_NOTES=@OLD_SQL_NOTES */;",
];

const CHARSET_SAVE: &str = "/*!40101 SET @saved_cs_client     = @@character_set_client */;";
const CHARSET_CLIENT: &str = "/*!50503 SET character_set_client = utf8mb4 */;";
const CHARSET_RESTORE: &str = "/*!40101 SET character_set_client = @saved_cs_client */;";

/// Immutable boilerplate written around the dumped statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Boilerplate {
    /// Tool marker on the first header line
    pub tool_name: &'static str,
    pub tool_version: &'static str,
    /// Session-variable saves, one per line
    pub header_directives: &'static [&'static str],
    /// Time zone restore that opens the footer
    pub time_zone_restore: &'static str,
    /// Remaining restores, in reverse order of the saves
    pub footer_directives: &'static [&'static str],
    pub charset_save: &'static str,
    pub charset_client: &'static str,
    pub charset_restore: &'static str,
}

impl Default for Boilerplate {
    fn default() -> Self {
        Boilerplate {
            tool_name: "Go SQL Dump",
            tool_version: env!("CARGO_PKG_VERSION"),
            header_directives: HEADER_DIRECTIVES,
            time_zone_restore: TIME_ZONE_RESTORE,
            footer_directives: FOOTER_DIRECTIVES,
            charset_save: CHARSET_SAVE,
            charset_client: CHARSET_CLIENT,
            charset_restore: CHARSET_RESTORE,
        }
    }
}

impl Boilerplate {
    pub fn write_header<W: Write + ?Sized>(&self, out: &mut W, server_version: &str) -> io::Result<()> {
        writeln!(out, "-- {} {}", self.tool_name, self.tool_version)?;
        writeln!(out, "--")?;
        writeln!(out, "-- ------------------------------------------------------")?;
        writeln!(out, "-- Server version\t{}", server_version)?;
        writeln!(out)?;
        for line in self.header_directives {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    /// Writes the structure section: comment block, `DROP TABLE IF EXISTS`
    /// and the verbatim `CREATE TABLE` wrapped in charset save/restore.
    pub fn write_table_structure<W: Write + ?Sized>(
        &self,
        out: &mut W,
        table: &TableDescriptor,
    ) -> io::Result<()> {
        let name = quote_ident(&table.name);
        writeln!(out)?;
        writeln!(out, "--")?;
        writeln!(out, "-- Table structure for table {}", name)?;
        writeln!(out, "--")?;
        writeln!(out)?;
        writeln!(out, "DROP TABLE IF EXISTS {};", name)?;
        writeln!(out, "{}", self.charset_save)?;
        writeln!(out, "{}", self.charset_client)?;
        writeln!(out, "{};", table.create_sql)?;
        writeln!(out, "{}", self.charset_restore)
    }

    pub fn write_data_header<W: Write + ?Sized>(&self, out: &mut W, table: &str) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "--")?;
        writeln!(out, "-- Dumping data for table {}", quote_ident(table))?;
        writeln!(out, "--")?;
        writeln!(out)
    }

    pub fn write_lock<W: Write + ?Sized>(&self, out: &mut W, table: &str) -> io::Result<()> {
        writeln!(out, "LOCK TABLES {} WRITE;", quote_ident(table))
    }

    pub fn write_unlock<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "UNLOCK TABLES;")
    }

    pub fn write_disable_keys<W: Write + ?Sized>(&self, out: &mut W, table: &str) -> io::Result<()> {
        writeln!(out, "/*!40000 ALTER TABLE {} DISABLE KEYS */;", quote_ident(table))
    }

    pub fn write_enable_keys<W: Write + ?Sized>(&self, out: &mut W, table: &str) -> io::Result<()> {
        writeln!(out, "/*!40000 ALTER TABLE {} ENABLE KEYS */;", quote_ident(table))
    }

    pub fn write_footer<W: Write + ?Sized>(&self, out: &mut W, completed_at: &str) -> io::Result<()> {
        writeln!(out, "{}", self.time_zone_restore)?;
        writeln!(out)?;
        for line in self.footer_directives {
            writeln!(out, "{}", line)?;
        }
        writeln!(out)?;
        writeln!(out, "-- Dump completed on {}", completed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&Boilerplate, &mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&Boilerplate::default(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header() {
        let text = render(|b, out| b.write_header(out, "8.0.36"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("-- Go SQL Dump {}", env!("CARGO_PKG_VERSION")));
        assert_eq!(lines[3], "-- Server version\t8.0.36");
        assert_eq!(lines[4], "");
        assert_eq!(lines.len(), 5 + HEADER_DIRECTIVES.len());
        assert!(text.ends_with("SQL_NOTES=0 */;\n"));
    }

    #[test]
    fn test_table_structure() {
        let descriptor = TableDescriptor {
            name: "t".to_string(),
            create_sql: "CREATE TABLE `t` (\n  `id` int\n)".to_string(),
        };
        let text = render(|b, out| b.write_table_structure(out, &descriptor));
        assert_eq!(
            text,
            "\n--\n-- Table structure for table `t`\n--\n\n\
             DROP TABLE IF EXISTS `t`;\n\
             /*!40101 SET @saved_cs_client     = @@character_set_client */;\n\
             /*!50503 SET character_set_client = utf8mb4 */;\n\
             CREATE TABLE `t` (\n  `id` int\n);\n\
             /*!40101 SET character_set_client = @saved_cs_client */;\n"
        );
    }

    #[test]
    fn test_footer_mirrors_header() {
        let text = render(|b, out| b.write_footer(out, "2024-01-01 00:00:00"));
        assert!(text.starts_with("/*!40103 SET TIME_ZONE=@OLD_TIME_ZONE */;\n\n"));
        assert!(text.ends_with("SQL_NOTES */;\n\n-- Dump completed on 2024-01-01 00:00:00\n"));

        // every saved variable is restored
        for var in ["SQL_MODE", "FOREIGN_KEY_CHECKS", "UNIQUE_CHECKS", "CHARACTER_SET_CLIENT",
                    "CHARACTER_SET_RESULTS", "COLLATION_CONNECTION", "SQL_NOTES", "TIME_ZONE"] {
            assert!(text.contains(&format!("@OLD_{}", var)), "{} not restored", var);
        }
    }

    #[test]
    fn test_data_markers() {
        let text = render(|b, out| {
            b.write_lock(out, "t")?;
            b.write_disable_keys(out, "t")?;
            b.write_enable_keys(out, "t")?;
            b.write_unlock(out)
        });
        assert_eq!(
            text,
            "LOCK TABLES `t` WRITE;\n\
             /*!40000 ALTER TABLE `t` DISABLE KEYS */;\n\
             /*!40000 ALTER TABLE `t` ENABLE KEYS */;\n\
             UNLOCK TABLES;\n"
        );
    }
}
