use serde::Serialize;

/// Languages offered by both pickers, sorted alphabetically.
pub const LANGUAGES: &[&str] = &[
    "C#",
    "C++",
    "CSS",
    "Go",
    "HTML",
    "Java",
    "JavaScript",
    "Kotlin",
    "PHP",
    "Python",
    "React (JSX)",
    "Ruby",
    "Rust",
    "Swift",
    "TypeScript",
];

pub const DEFAULT_SOURCE_LANGUAGE: &str = "PHP";
pub const DEFAULT_TARGET_LANGUAGE: &str = "JavaScript";

/// The only source language with canned examples and the PSR-12 formatter.
pub const EXAMPLE_LANGUAGE: &str = "PHP";

/// Map a display name ("C#", "React (JSX)") to the token highlight.js expects.
///
/// Unknown names pass through lowercased; the highlighter decides what to do
/// with tokens it does not recognise.
pub fn highlight_language(lang: &str) -> String {
    let lower = lang.to_lowercase();
    match lower.as_str() {
        "react (jsx)" => "jsx".to_string(),
        "c#" => "csharp".to_string(),
        "c++" => "cpp".to_string(),
        _ => lower,
    }
}

pub fn is_supported(lang: &str) -> bool {
    LANGUAGES.contains(&lang)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CodeExample {
    pub name: &'static str,
    pub code: &'static str,
}

pub const PHP_EXAMPLES: &[CodeExample] = &[
    CodeExample {
        name: "Database Query",
        code: r#"<?php
$servername = "localhost";
$username = "username";
$password = "password";
$dbname = "myDB";

// Create connection
$conn = new mysqli($servername, $username, $password, $dbname);

// Check connection
if ($conn->connect_error) {
  die("Connection failed: " . $conn->connect_error);
}

$sql = "SELECT id, firstname, lastname FROM Guests";
$result = $conn->query($sql);

if ($result->num_rows > 0) {
  // output data of each row
  while($row = $result->fetch_assoc()) {
    echo "id: " . $row["id"]. " - Name: " . $row["firstname"]. " " . $row["lastname"]. "<br>";
  }
} else {
  echo "0 results";
}
$conn->close();
?>"#,
    },
    CodeExample {
        name: "File Handling",
        code: r#"<?php
$myfile = fopen("webdictionary.txt", "r") or die("Unable to open file!");
echo fread($myfile,filesize("webdictionary.txt"));
fclose($myfile);
?>"#,
    },
    CodeExample {
        name: "JSON Encode",
        code: r#"<?php
$age = array("Peter"=>35, "Ben"=>37, "Joe"=>43);
header('Content-Type: application/json');
echo json_encode($age);
?>"#,
    },
    CodeExample {
        name: "Simple Class",
        code: r#"<?php
class Car {
  public $color;
  public $model;
  public function __construct($color, $model) {
    $this->color = $color;
    $this->model = $model;
  }
  public function message() {
    return "My car is a " . $this->color . " " . $this->model . "!";
  }
}

$myCar = new Car("black", "Volvo");
echo $myCar -> message();
?>"#,
    },
];

pub fn find_example(name: &str) -> Option<&'static CodeExample> {
    PHP_EXAMPLES.iter().find(|example| example.name == name)
}

/// Examples offered for the given source language (empty unless PHP).
pub fn examples_for(source_language: &str) -> &'static [CodeExample] {
    if source_language == EXAMPLE_LANGUAGE {
        PHP_EXAMPLES
    } else {
        &[]
    }
}
