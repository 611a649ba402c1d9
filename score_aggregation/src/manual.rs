/*!

This is the long-form manual for `score_aggregation` and `judgetally`.

## Score records

Each judge submits one score sheet per candidate. A sheet contains:

| key             | content                                                   |
|-----------------|-----------------------------------------------------------|
| `judgeUsername` | the judge who filled the sheet                            |
| `group`         | the group number of the candidate                         |
| `groupIndex`    | the position of the candidate inside the group            |
| `name`          | the name of the candidate                                 |
| `enName`        | the English (or pinyin) name of the candidate             |
| `organization`  | the school or company of the candidate                    |
| `category`      | free text, for example `PU0`                              |
| `selectedStages`| the teaching stages the judge observed                    |
| `scores`        | one number per criterion: `1_1`, `1_2`, `2_1`, `2_2`, `2_3`, `3_1`, `3_2` |
| `totalScore`    | the total given by the judge                              |
| `feedback`      | free text                                                 |

The total is taken as written by the judge. It is never recomputed from the
criterion scores, since the weighting of the criteria is decided outside of
this program.

Missing or unreadable numbers count as `0`. Missing text counts as empty.
Unknown criterion codes are dropped with a warning.

## Candidates

The records of the same candidate are found through their identity code:
the group number and the index, each padded with zeros to two characters,
joined with a dash. Group `3`, index `5` gives `03-05`. Records without a
group or index all go to `00-00`.

Candidates are listed in the natural order of their codes: `2-9` comes
before `2-10`.

## Averages

For each candidate:
- every criterion is averaged over all the judges (a missing score counts as
  `0`) and rounded to one decimal, halves away from zero;
- the totals are averaged and displayed with one decimal (`88.0`);
- the sums are exact to a millionth of a point, so the order of the sheets
  never changes a result;
- the stages are merged, keeping the order in which they first appear.

For the whole session: number of sheets, number of candidates, mean of all
the totals (`0` when there is no sheet) and the highest total.

## Corrections

The names, the organization and the merged feedback of a candidate can be
corrected by a reviewer. The corrections are kept in an overrides file:

```json
{
  "01-01": {
    "name": "张三",
    "enName": "Zhang San",
    "organization": "No. 2 Middle School",
    "feedback": "【评委 li】:\nClear structure."
  }
}
```

When a candidate is seen for the first time, the fields that are not in the
file are filled from the last sheet of that candidate and from the merged
feedback of all the judges. Empty values are not written, so a field stays
open until a sheet provides it. Fields already in the file are never
replaced, even if new sheets arrive later.

On the command line, `--edit 01-01.name=张三` changes one field.

## Input formats

The following providers are supported:
* `json` an array of records, or a sync snapshot (`{"candidates": [...]}`)
* `csv` a table with a header row using the keys above. The criteria are
  columns named by their codes. The stages are separated by `;` or `、`.
* `xlsx` the same table in an Excel workbook (first worksheet, or the one
  named with `excelWorksheetName`).

## Session configuration

```json
{
  "outputSettings": {
    "contestName": "Teaching contest 2024",
    "outputDirectory": "reports",
    "exportFile": "all_scores.csv",
    "summaryFile": "summary.json"
  },
  "recordSources": [
    { "provider": "json", "filePath": "records.json" },
    { "provider": "xlsx", "filePath": "late.xlsx", "excelWorksheetName": "Sheet1" }
  ],
  "overridesFile": "overrides.json"
}
```

The paths are relative to the configuration file.

## Outputs

* a CSV export of all the sheets, one row per sheet, without any averaging;
* one printable HTML report per candidate, named `report_{code}.html`;
* a JSON summary, printed or written to a file, that can be checked against
  a reference summary with `--reference`.

## Sharing a session

`--create-session` stores the current records in the sync directory and
prints a token. Another reviewer runs `--join-session TOKEN` to replace their
records with the shared ones. Tokens shorter than 5 characters are refused.
*/
